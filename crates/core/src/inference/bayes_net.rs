use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{ElimError, Result};
use crate::types::Key;

use super::conditional::Conditional;

/// An ordered chain of conditionals: the result of eliminating a factor graph
/// without clustering.
///
/// Conditionals are stored in elimination order, so every parent of the
/// conditional at position `i` is frontal in some conditional at `j > i`.
/// Back-substitution therefore runs from the last conditional to the first.
///
/// Conditionals are shared: cloning a net copies the sequence, not the
/// conditionals themselves.
#[derive(Debug)]
pub struct BayesNet<C> {
    conditionals: Vec<Arc<C>>,
}

impl<C> Clone for BayesNet<C> {
    fn clone(&self) -> Self {
        Self {
            conditionals: self.conditionals.clone(),
        }
    }
}

impl<C> Default for BayesNet<C> {
    fn default() -> Self {
        Self {
            conditionals: Vec::new(),
        }
    }
}

impl<C: Conditional> BayesNet<C> {
    /// Create an empty Bayes net.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a Bayes net from conditionals given in elimination order.
    pub fn from_conditionals<I: IntoIterator<Item = C>>(conditionals: I) -> Self {
        conditionals.into_iter().collect()
    }

    /// Append a conditional at the end of the chain (eliminated last so far).
    pub fn push(&mut self, conditional: C) {
        self.conditionals.push(Arc::new(conditional));
    }

    /// Append a conditional already shared with another container.
    pub fn push_shared(&mut self, conditional: Arc<C>) {
        self.conditionals.push(conditional);
    }

    pub fn len(&self) -> usize {
        self.conditionals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditionals.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Arc<C>> {
        self.conditionals.get(position)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<C>> {
        self.conditionals.iter()
    }

    /// Frontal keys of all conditionals, in storage order.
    pub fn frontal_keys(&self) -> Vec<Key> {
        self.conditionals
            .iter()
            .flat_map(|c| c.frontals().iter().copied())
            .collect()
    }

    /// Position-wise equality: same length and equal conditionals at every position.
    pub fn equals(&self, other: &Self, tol: f64) -> bool {
        self.len() == other.len()
            && self
                .conditionals
                .iter()
                .zip(other.conditionals.iter())
                .all(|(a, b)| a.equals(b, tol))
    }

    /// Check that the chain is a valid elimination order.
    ///
    /// # Errors
    /// - [`ElimError::OrderingViolation`] if a parent is not frontal later in the chain.
    /// - [`ElimError::DuplicateFrontal`] if a key is frontal in two conditionals.
    pub fn validate(&self) -> Result<()> {
        let mut eliminated: HashSet<Key> = HashSet::new();
        for (position, conditional) in self.conditionals.iter().enumerate().rev() {
            if let Some(&key) = conditional
                .parents()
                .iter()
                .find(|k| !eliminated.contains(*k))
            {
                return Err(ElimError::OrderingViolation { key, position });
            }
            for &key in conditional.frontals() {
                if !eliminated.insert(key) {
                    return Err(ElimError::DuplicateFrontal(key));
                }
            }
        }
        Ok(())
    }
}

impl<C> FromIterator<C> for BayesNet<C> {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        Self {
            conditionals: iter.into_iter().map(Arc::new).collect(),
        }
    }
}

impl<'a, C> IntoIterator for &'a BayesNet<C> {
    type Item = &'a Arc<C>;
    type IntoIter = std::slice::Iter<'a, Arc<C>>;

    fn into_iter(self) -> Self::IntoIter {
        self.conditionals.iter()
    }
}

impl<C: fmt::Display> fmt::Display for BayesNet<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BayesNet of size {}", self.conditionals.len())?;
        for (i, conditional) in self.conditionals.iter().enumerate() {
            writeln!(f, "  [{}] {}", i, conditional)?;
        }
        Ok(())
    }
}
