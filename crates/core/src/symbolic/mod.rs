//! Structure-only specialization, used for sparsity analysis before a numeric
//! elimination is run. No solve operations exist at this level.

mod conditional;

pub use conditional::SymbolicConditional;

use crate::inference::{BayesNet, BayesTree, Clique};

/// A chain of structural dependencies.
pub type SymbolicBayesNet = BayesNet<SymbolicConditional>;

/// A Bayes tree describing only which variables are connected.
pub type SymbolicBayesTree = BayesTree<SymbolicConditional>;

pub type SymbolicClique = Clique<SymbolicConditional>;
