//! Integration test: solve, transpose-solve and export a small Gaussian Bayes
//! net with multi-dimensional variables, and check the results against the
//! dense system it represents.
//!
//! Variables (elimination order 0, 1, 2):
//!   x0 in R^2, x1 in R^1, x2 in R^2
//!
//! Conditionals:
//!   p(x0 | x1, x2), p(x1 | x2), p(x2)

use approx::assert_relative_eq;
use bayestree_core::config::DEFAULT_EQUALITY_TOL;
use bayestree_core::linear::ColumnBlock;
use bayestree_core::matrix::sparse::spmv;
use bayestree_core::{
    ElimError, GaussianBayesNet, GaussianConditional, NoiseModel, SolveSettings, VectorValues,
};
use nalgebra::{DMatrix, DVector};

fn create_test_net() -> GaussianBayesNet {
    let c0 = GaussianConditional::new(
        vec![(0, DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 0.0, 5.0]))],
        vec![
            (1, DMatrix::from_row_slice(2, 1, &[1.0, 0.0])),
            (2, DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0])),
        ],
        DVector::from_column_slice(&[1.0, 5.0]),
    )
    .unwrap();
    let c1 = GaussianConditional::new(
        vec![(1, DMatrix::from_element(1, 1, 4.0))],
        vec![(2, DMatrix::from_row_slice(1, 2, &[1.0, -1.0]))],
        DVector::from_element(1, 3.0),
    )
    .unwrap();
    let c2 = GaussianConditional::new(
        vec![(2, DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 0.0, 3.0]))],
        vec![],
        DVector::from_column_slice(&[4.0, 6.0]),
    )
    .unwrap();
    GaussianBayesNet::from_conditionals([c0, c1, c2])
}

/// Stack `values` in the column order of `ordering`.
fn stack(values: &VectorValues, ordering: &[ColumnBlock]) -> DVector<f64> {
    let keys: Vec<_> = ordering.iter().map(|b| b.key).collect();
    values.vector(&keys).unwrap()
}

/// Split a stacked vector back into per-variable values.
fn split(v: &DVector<f64>, ordering: &[ColumnBlock]) -> VectorValues {
    ordering
        .iter()
        .map(|b| (b.key, v.rows(b.offset, b.dim).into_owned()))
        .collect()
}

#[test]
fn test_net_is_valid_elimination_order() {
    let bn = create_test_net();
    assert!(bn.validate().is_ok());
    assert_eq!(bn.dim(), 5);
    assert_eq!(bn.frontal_keys(), vec![0, 1, 2]);
}

#[test]
fn test_optimize_hand_computed() {
    let x = create_test_net().optimize().unwrap();

    // 2 a + b = 4, 3 b = 6
    assert_relative_eq!(x.get(2).unwrap()[0], 1.0, epsilon = 1e-12);
    assert_relative_eq!(x.get(2).unwrap()[1], 2.0, epsilon = 1e-12);
    // 4 x1 + (1 - 2) = 3
    assert_relative_eq!(x.get(1).unwrap()[0], 1.0, epsilon = 1e-12);
    // 5 b + x2[0] = 5; a + 2 b + x1 + x2[1] = 1
    assert_relative_eq!(x.get(0).unwrap()[1], 0.8, epsilon = 1e-12);
    assert_relative_eq!(x.get(0).unwrap()[0], -3.6, epsilon = 1e-12);
}

#[test]
fn test_optimize_solves_dense_system() {
    let bn = create_test_net();
    let (r, d) = bn.matrix().unwrap();
    assert_eq!(r.shape(), (5, 5));
    assert!((0..5).all(|j| (j + 1..5).all(|i| r[(i, j)] == 0.0)));

    let x = stack(&bn.optimize().unwrap(), &bn.ordering());
    let residual = &r * &x - &d;
    assert!(residual.norm() < 1e-10, "residual {}", residual.norm());
}

#[test]
fn test_back_substitute_of_rhs_equals_optimize() {
    let bn = create_test_net();
    let (_, d) = bn.matrix().unwrap();
    let gx = split(&d, &bn.ordering());

    let x = bn.back_substitute(&gx).unwrap();
    assert!(x.equals(&bn.optimize().unwrap(), DEFAULT_EQUALITY_TOL));
}

#[test]
fn test_back_substitute_missing_rhs() {
    let bn = create_test_net();
    let mut gx = VectorValues::new();
    gx.insert(2, DVector::from_column_slice(&[4.0, 6.0]));
    gx.insert_scalar(1, 3.0);
    assert_eq!(bn.back_substitute(&gx), Err(ElimError::UnboundVariable(0)));
}

#[test]
fn test_back_substitute_wrong_dimension() {
    let bn = create_test_net();
    let mut gx = VectorValues::new();
    gx.insert_scalar(2, 4.0);
    assert!(matches!(
        bn.back_substitute(&gx),
        Err(ElimError::DimensionMismatch { expected: 2, got: 1, .. })
    ));
}

#[test]
fn test_back_substitute_transpose_matches_dense() {
    let bn = create_test_net();
    let ordering = bn.ordering();
    let (r, _) = bn.matrix().unwrap();
    let g = DVector::from_column_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);

    let expected = r.tr_solve_upper_triangular(&g).unwrap();
    let y = bn.back_substitute_transpose(&split(&g, &ordering)).unwrap();
    let got = stack(&y, &ordering);
    for i in 0..5 {
        assert_relative_eq!(got[i], expected[i], epsilon = 1e-10);
    }
}

#[test]
fn test_determinant_is_product_of_diagonal() {
    let bn = create_test_net();
    // 1 * 5 * 4 * 2 * 3
    assert_relative_eq!(bn.determinant().unwrap(), 120.0, epsilon = 1e-9);
    assert_relative_eq!(bn.log_determinant().unwrap(), 120.0_f64.ln(), epsilon = 1e-12);
    assert_relative_eq!(
        bn.determinant().unwrap(),
        bn.log_determinant().unwrap().exp(),
        epsilon = 1e-12
    );
}

#[test]
fn test_sparse_matrix_matches_dense() {
    let bn = create_test_net();
    let (dense, d) = bn.matrix().unwrap();
    let (sparse, sparse_d) = bn.sparse_matrix().unwrap();
    assert_eq!(d, sparse_d);
    assert_eq!(sparse.rows(), 5);
    assert_eq!(sparse.nnz(), dense.iter().filter(|v| **v != 0.0).count());

    let x = stack(&bn.optimize().unwrap(), &bn.ordering());
    let y = spmv(&sparse, x.as_slice());
    for i in 0..5 {
        assert_relative_eq!(y[i], d[i], epsilon = 1e-10);
    }
}

#[test]
fn test_zero_diagonal_is_singular() {
    let bn = GaussianBayesNet::from_conditionals([
        GaussianConditional::scalar(1, 1.0, &[(2, 1.0)], 6.0).unwrap(),
        GaussianConditional::scalar(2, 0.0, &[], 2.0).unwrap(),
    ]);
    let singular = ElimError::SingularSystem { key: 2, pivot: 0.0 };
    assert_eq!(bn.optimize(), Err(singular.clone()));
    assert_eq!(bn.determinant(), Err(singular.clone()));
    assert_eq!(bn.log_determinant(), Err(singular));
}

#[test]
fn test_pivot_tolerance_is_configurable() {
    let bn = GaussianBayesNet::from_conditionals([
        GaussianConditional::scalar(0, 1e-8, &[], 1.0).unwrap(),
    ]);
    assert!(bn.optimize().is_ok());
    let strict = SolveSettings::new().pivot_tolerance(1e-6);
    assert!(matches!(
        bn.optimize_with(&strict),
        Err(ElimError::SingularSystem { key: 0, .. })
    ));
    assert!(bn.log_determinant_with(&strict).is_err());
}

#[test]
fn test_constrained_rows() {
    // Row 0 has sigma 0.5, row 1 is a hard constraint.
    let bn = GaussianBayesNet::from_conditionals([GaussianConditional::with_model(
        vec![(0, DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 3.0]))],
        vec![],
        DVector::from_column_slice(&[4.0, 9.0]),
        NoiseModel::diagonal(DVector::from_column_slice(&[0.5, 0.0])).unwrap(),
    )
    .unwrap()]);

    // Whitening does not change the solution.
    let x = bn.optimize().unwrap();
    assert_relative_eq!(x.get(0).unwrap()[0], 2.0, epsilon = 1e-12);
    assert_relative_eq!(x.get(0).unwrap()[1], 3.0, epsilon = 1e-12);

    // Whitened pivots 4 and 3.
    assert_relative_eq!(bn.determinant().unwrap(), 12.0, epsilon = 1e-9);

    // back_substitute scales by the sigmas, the constrained row by zero.
    let mut gx = VectorValues::new();
    gx.insert(0, DVector::from_column_slice(&[4.0, 9.0]));
    let y = bn.back_substitute(&gx).unwrap();
    assert_relative_eq!(y.get(0).unwrap()[0], 1.0, epsilon = 1e-12);
    assert_relative_eq!(y.get(0).unwrap()[1], 0.0, epsilon = 1e-12);

    // Transposed: R' z = [4, 9] gives z = [2, 3], then the same sigma scaling.
    let t = bn.back_substitute_transpose(&gx).unwrap();
    assert_relative_eq!(t.get(0).unwrap()[0], 1.0, epsilon = 1e-12);
    assert_relative_eq!(t.get(0).unwrap()[1], 0.0, epsilon = 1e-12);
}

#[test]
fn test_equals_and_clone() {
    let a = create_test_net();
    let b = create_test_net();
    assert!(a.equals(&a, DEFAULT_EQUALITY_TOL));
    assert!(a.equals(&b, DEFAULT_EQUALITY_TOL));
    assert!(b.equals(&a, DEFAULT_EQUALITY_TOL));
    assert!(a.clone().equals(&a, 0.0));

    let c = GaussianBayesNet::from_conditionals([
        GaussianConditional::scalar(1, 1.0, &[(2, 1.0)], 6.0).unwrap(),
        GaussianConditional::scalar(2, 1.0, &[], 2.0).unwrap(),
    ]);
    assert!(!a.equals(&c, 1e9));
}
