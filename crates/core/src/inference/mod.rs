//! Containers shared by every conditional flavour: chains, cliques and trees.

mod bayes_net;
mod bayes_tree;
mod clique;
mod conditional;

pub use bayes_net::BayesNet;
pub use bayes_tree::BayesTree;
pub use clique::{Clique, CliqueId};
pub use conditional::Conditional;

pub(crate) use conditional::check_key_layout;
