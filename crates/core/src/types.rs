/// Identifier of an unknown variable. Keys are totally ordered.
pub type Key = u64;

/// The scalar type used throughout the library.
pub type Scalar = f64;

/// Sparse matrix type (CSC format).
pub type SparseMat = sprs::CsMat<Scalar>;
