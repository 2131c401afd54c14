//! Numerical primitives: the discrete cylindrical Laplacian and the
//! Nelder-Mead simplex minimizer.

pub mod laplacian;
pub mod simplex;
