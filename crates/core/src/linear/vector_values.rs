use std::fmt;

use indexmap::IndexMap;
use nalgebra::DVector;

use crate::error::{ElimError, Result};
use crate::matrix::slices_equal;
use crate::types::Key;

/// A collection of vector-valued variables, keyed by variable and kept in
/// insertion order.
///
/// Used both for solutions returned by the solvers and for right-hand sides
/// supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorValues {
    values: IndexMap<Key, DVector<f64>>,
}

impl VectorValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value of `key`, returning the previous value.
    pub fn insert(&mut self, key: Key, value: DVector<f64>) -> Option<DVector<f64>> {
        self.values.insert(key, value)
    }

    /// Insert a one-dimensional value.
    pub fn insert_scalar(&mut self, key: Key, value: f64) -> Option<DVector<f64>> {
        self.insert(key, DVector::from_element(1, value))
    }

    pub fn get(&self, key: Key) -> Option<&DVector<f64>> {
        self.values.get(&key)
    }

    pub fn get_mut(&mut self, key: Key) -> Option<&mut DVector<f64>> {
        self.values.get_mut(&key)
    }

    /// Value of `key`, or [`ElimError::UnboundVariable`].
    pub fn at(&self, key: Key) -> Result<&DVector<f64>> {
        self.values.get(&key).ok_or(ElimError::UnboundVariable(key))
    }

    pub fn contains(&self, key: Key) -> bool {
        self.values.contains_key(&key)
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Total dimension: sum of all vector lengths.
    pub fn dim(&self) -> usize {
        self.values.values().map(|v| v.len()).sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key, &DVector<f64>)> + '_ {
        self.values.iter().map(|(&k, v)| (k, v))
    }

    /// Concatenate the values of `keys`, in that order, into one vector.
    ///
    /// # Errors
    /// Returns [`ElimError::UnboundVariable`] for the first missing key.
    pub fn vector(&self, keys: &[Key]) -> Result<DVector<f64>> {
        let blocks = keys
            .iter()
            .map(|&k| self.at(k))
            .collect::<Result<Vec<_>>>()?;
        let dim = blocks.iter().map(|b| b.len()).sum();
        let mut out = DVector::zeros(dim);
        let mut offset = 0;
        for block in blocks {
            out.rows_mut(offset, block.len()).copy_from(block);
            offset += block.len();
        }
        Ok(out)
    }

    /// Same keys, same dimensions, all entries within `tol`.
    pub fn equals(&self, other: &Self, tol: f64) -> bool {
        self.len() == other.len()
            && self.values.iter().all(|(k, v)| {
                other
                    .values
                    .get(k)
                    .is_some_and(|w| slices_equal(v.as_slice(), w.as_slice(), tol))
            })
    }
}

impl FromIterator<(Key, DVector<f64>)> for VectorValues {
    fn from_iter<I: IntoIterator<Item = (Key, DVector<f64>)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for VectorValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.values {
            let entries: Vec<String> = value.iter().map(|x| format!("{:.6}", x)).collect();
            writeln!(f, "{}: [{}]", key, entries.join(", "))?;
        }
        Ok(())
    }
}
