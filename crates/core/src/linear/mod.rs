//! Linear-Gaussian specialization: conditionals with numeric blocks, and the
//! solvers that run over Bayes nets and Bayes trees of them.

mod gaussian_bayes_net;
mod gaussian_bayes_tree;
mod gaussian_conditional;
mod noise_model;
mod vector_values;

pub use gaussian_bayes_net::{ColumnBlock, GaussianBayesNet};
pub use gaussian_bayes_tree::GaussianBayesTree;
pub use gaussian_conditional::GaussianConditional;
pub use noise_model::NoiseModel;
pub use vector_values::VectorValues;

use crate::inference::Clique;

pub type GaussianClique = Clique<GaussianConditional>;
