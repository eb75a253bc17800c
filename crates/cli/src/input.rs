use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;

use bayestree_core::{GaussianBayesNet, GaussianConditional, Key, NoiseModel};

/// On-disk description of a Gaussian Bayes net, conditionals in elimination order.
#[derive(Debug, Deserialize)]
pub struct NetFile {
    pub conditionals: Vec<ConditionalEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ConditionalEntry {
    pub frontals: Vec<BlockEntry>,
    #[serde(default)]
    pub parents: Vec<BlockEntry>,
    pub d: Vec<f64>,
    #[serde(default)]
    pub sigmas: Option<Vec<f64>>,
}

/// One variable's column block, written as a list of rows.
#[derive(Debug, Deserialize)]
pub struct BlockEntry {
    pub key: Key,
    pub matrix: Vec<Vec<f64>>,
}

impl BlockEntry {
    fn to_matrix(&self) -> Result<DMatrix<f64>> {
        let nrows = self.matrix.len();
        let ncols = self.matrix.first().map_or(0, |r| r.len());
        if let Some(row) = self.matrix.iter().find(|r| r.len() != ncols) {
            bail!(
                "block of variable {} is ragged: rows of length {} and {}",
                self.key,
                ncols,
                row.len()
            );
        }
        let data: Vec<f64> = self.matrix.iter().flatten().copied().collect();
        Ok(DMatrix::from_row_slice(nrows, ncols, &data))
    }
}

impl ConditionalEntry {
    fn build(&self) -> Result<GaussianConditional> {
        let blocks = |entries: &[BlockEntry]| -> Result<Vec<(Key, DMatrix<f64>)>> {
            entries
                .iter()
                .map(|b| b.to_matrix().map(|m| (b.key, m)))
                .collect()
        };
        let model = match &self.sigmas {
            Some(sigmas) => NoiseModel::diagonal(DVector::from_column_slice(sigmas))?,
            None => NoiseModel::Unit,
        };
        Ok(GaussianConditional::with_model(
            blocks(&self.frontals)?,
            blocks(&self.parents)?,
            DVector::from_column_slice(&self.d),
            model,
        )?)
    }
}

impl NetFile {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Malformed Bayes net description")
    }

    pub fn to_bayes_net(&self) -> Result<GaussianBayesNet> {
        let mut net = GaussianBayesNet::new();
        for (i, entry) in self.conditionals.iter().enumerate() {
            let conditional = entry
                .build()
                .with_context(|| format!("Invalid conditional at position {}", i))?;
            net.push(conditional);
        }
        Ok(net)
    }
}

/// Read and assemble the Bayes net stored at `path`.
pub fn load_bayes_net(path: &Path) -> Result<GaussianBayesNet> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    NetFile::parse(&json)
        .and_then(|file| file.to_bayes_net())
        .with_context(|| format!("Failed to load Bayes net from '{}'", path.display()))
}
