use std::fmt;

use crate::error::{ElimError, Result};
use crate::inference::{check_key_layout, Conditional};
use crate::types::Key;

/// A structure-only conditional: which frontal variables depend on which parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicConditional {
    keys: Vec<Key>,
    nr_frontals: usize,
}

impl SymbolicConditional {
    /// Conditional on `frontals` given `parents`.
    ///
    /// # Errors
    /// Returns [`ElimError::InvalidConditional`] if `frontals` is empty or a key repeats.
    pub fn new(frontals: Vec<Key>, parents: Vec<Key>) -> Result<Self> {
        let nr_frontals = frontals.len();
        let mut keys = frontals;
        keys.extend(parents);
        Self::from_keys(keys, nr_frontals)
    }

    /// Conditional whose first `nr_frontals` keys are frontal.
    pub fn from_keys(keys: Vec<Key>, nr_frontals: usize) -> Result<Self> {
        check_key_layout(&keys, nr_frontals).map_err(ElimError::InvalidConditional)?;
        Ok(Self { keys, nr_frontals })
    }

    /// Caller guarantees the layout was already checked.
    pub(crate) fn from_checked_keys(keys: Vec<Key>, nr_frontals: usize) -> Self {
        Self { keys, nr_frontals }
    }

    /// A root conditional on a single variable.
    pub fn single(key: Key) -> Self {
        Self {
            keys: vec![key],
            nr_frontals: 1,
        }
    }
}

impl Conditional for SymbolicConditional {
    fn keys(&self) -> &[Key] {
        &self.keys
    }

    fn nr_frontals(&self) -> usize {
        self.nr_frontals
    }

    /// Symbolic conditionals carry no numbers, so `tol` is unused.
    fn equals(&self, other: &Self, _tol: f64) -> bool {
        self == other
    }
}

impl fmt::Display for SymbolicConditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P(")?;
        for (i, key) in self.frontals().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", key)?;
        }
        if self.nr_parents() > 0 {
            write!(f, " |")?;
            for key in self.parents() {
                write!(f, " {}", key)?;
            }
        }
        write!(f, ")")
    }
}
