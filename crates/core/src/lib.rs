pub mod config;
pub mod error;
pub mod inference;
pub mod linear;
pub mod matrix;
pub mod symbolic;
pub mod types;

pub use config::SolveSettings;
pub use error::{ElimError, Result};
pub use inference::{BayesNet, BayesTree, Clique, CliqueId, Conditional};
pub use linear::{GaussianBayesNet, GaussianBayesTree, GaussianConditional, NoiseModel, VectorValues};
pub use symbolic::{SymbolicBayesNet, SymbolicBayesTree, SymbolicConditional};
pub use types::Key;
