//! Exponential-basis representation of the annulus mass flows.
//!
//! - [`ComplexVector`] stores coefficients over a basis
//! - [`SpectralProcess`] derives the basis and the star-formation solution
//!   from [`ModelParameters`](crate::model::ModelParameters), and provides the
//!   evaluation, integration and convolution operators

mod process;
mod vector;

pub use process::{
    DEGENERACY_TOLERANCE, IMAG_PERTURBATION, REAL_PERTURBATION, SpectralProcess, basis,
    resolve_degeneracy,
};
pub use vector::ComplexVector;
