use crate::config::SolveSettings;
use crate::error::Result;
use crate::inference::BayesTree;
use crate::symbolic::SymbolicBayesTree;

use super::gaussian_conditional::GaussianConditional;
use super::vector_values::VectorValues;

/// A Bayes tree of Gaussian cliques.
pub type GaussianBayesTree = BayesTree<GaussianConditional>;

impl BayesTree<GaussianConditional> {
    /// Solve for the most likely assignment with default settings.
    pub fn optimize(&self) -> Result<VectorValues> {
        self.optimize_with(&SolveSettings::default())
    }

    /// Top-down back-substitution: every clique is solved after its parent,
    /// so its separator values are always available.
    pub fn optimize_with(&self, settings: &SolveSettings) -> Result<VectorValues> {
        log::debug!("optimizing Bayes tree of {} cliques", self.len());
        let mut solution = VectorValues::new();
        for id in self.preorder() {
            let frontals = self[id].conditional().solve(&solution, settings)?;
            for (key, value) in frontals.iter() {
                solution.insert(key, value.clone());
            }
        }
        Ok(solution)
    }

    pub fn log_determinant(&self) -> Result<f64> {
        self.log_determinant_with(&SolveSettings::default())
    }

    /// Sum of the clique log-determinants.
    pub fn log_determinant_with(&self, settings: &SolveSettings) -> Result<f64> {
        self.preorder()
            .into_iter()
            .map(|id| self[id].conditional().log_determinant(settings))
            .sum::<Result<f64>>()
    }

    pub fn determinant(&self) -> Result<f64> {
        Ok(self.log_determinant()?.exp())
    }

    pub fn determinant_with(&self, settings: &SolveSettings) -> Result<f64> {
        Ok(self.log_determinant_with(settings)?.exp())
    }

    /// The same tree with structure-only conditionals.
    pub fn structure(&self) -> Result<SymbolicBayesTree> {
        self.map_conditionals(GaussianConditional::structure)
    }
}
