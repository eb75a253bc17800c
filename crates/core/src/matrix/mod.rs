pub mod dense;
pub mod sparse;

pub use dense::{matrices_equal, slices_equal, solve_upper, solve_upper_transpose};
pub use sparse::TripletBuilder;
