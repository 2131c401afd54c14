//! Forward diffusion solver and simplex parameter fitter.
//!
//! The forward problem: explicit finite-difference diffusion of an
//! iontophoretically released ion through a half-cylinder of tissue made
//! of three stacked layers, sampled at a probe over time. The inverse
//! problem: Nelder-Mead fitting of the middle layer's parameters (or of
//! apparent homogeneous parameters) against a target curve.

pub mod fitter;
pub mod kernel;
pub mod reference;
pub mod snapshot;
pub mod source;
pub mod stepper;
