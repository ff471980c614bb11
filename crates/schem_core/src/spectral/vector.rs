//! Fixed-length complex vectors used as spectral coefficient storage.

use std::ops::{Index, Mul};

use num_complex::Complex64;

use crate::error::{Result, SpectralError};

/// An ordered, fixed-length sequence of complex numbers.
///
/// Arithmetic never changes a vector in place; every operator returns a new one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComplexVector {
    values: Vec<Complex64>,
}

impl ComplexVector {
    /// All-zero vector of the given length
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![Complex64::new(0.0, 0.0); len],
        }
    }

    /// Vector with the given real parts and zero imaginary parts
    #[must_use]
    pub fn from_real(real: &[f64]) -> Self {
        Self {
            values: real.iter().map(|&re| Complex64::new(re, 0.0)).collect(),
        }
    }

    /// Vector from separate real and imaginary sequences
    pub fn from_parts(real: &[f64], imag: &[f64]) -> Result<Self> {
        if real.len() != imag.len() {
            return Err(SpectralError::DimensionMismatch {
                left: real.len(),
                right: imag.len(),
            });
        }
        Ok(Self {
            values: real
                .iter()
                .zip(imag)
                .map(|(&re, &im)| Complex64::new(re, im))
                .collect(),
        })
    }

    #[must_use]
    pub fn from_values(values: Vec<Complex64>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Complex64> {
        self.values.get(index).copied()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Complex64] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = &Complex64> {
        self.values.iter()
    }

    #[must_use]
    pub fn real_parts(&self) -> Vec<f64> {
        self.values.iter().map(|z| z.re).collect()
    }

    #[must_use]
    pub fn imag_parts(&self) -> Vec<f64> {
        self.values.iter().map(|z| z.im).collect()
    }

    /// Elementwise complex product
    pub fn hadamard(&self, other: &ComplexVector) -> Result<ComplexVector> {
        self.check_len(other)?;
        Ok(self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| a * b)
            .collect())
    }

    /// Elementwise sum
    pub fn checked_add(&self, other: &ComplexVector) -> Result<ComplexVector> {
        self.check_len(other)?;
        Ok(self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| a + b)
            .collect())
    }

    /// Multiply every entry by a real scalar
    #[must_use]
    pub fn scale(&self, factor: f64) -> ComplexVector {
        self.values.iter().map(|z| z * factor).collect()
    }

    /// Real part of the unconjugated dot product: `Σ Re(a)Re(b) − Im(a)Im(b)`.
    pub fn real_dot(&self, other: &ComplexVector) -> Result<f64> {
        self.check_len(other)?;
        Ok(self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| a.re * b.re - a.im * b.im)
            .sum())
    }

    /// Replace the real part at `index`, keeping the imaginary part.
    pub(crate) fn set_real(&mut self, index: usize, re: f64) -> Result<()> {
        let len = self.values.len();
        let slot = self
            .values
            .get_mut(index)
            .ok_or(SpectralError::IndexOutOfRange { index, len })?;
        slot.re = re;
        Ok(())
    }

    /// True when every component is finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|z| z.re.is_finite() && z.im.is_finite())
    }

    fn check_len(&self, other: &ComplexVector) -> Result<()> {
        if self.len() != other.len() {
            return Err(SpectralError::DimensionMismatch {
                left: self.len(),
                right: other.len(),
            });
        }
        Ok(())
    }
}

impl FromIterator<Complex64> for ComplexVector {
    fn from_iter<I: IntoIterator<Item = Complex64>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl Index<usize> for ComplexVector {
    type Output = Complex64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}

impl Mul<&ComplexVector> for f64 {
    type Output = ComplexVector;

    fn mul(self, rhs: &ComplexVector) -> ComplexVector {
        rhs.scale(self)
    }
}

impl Mul<f64> for ComplexVector {
    type Output = ComplexVector;

    fn mul(self, rhs: f64) -> ComplexVector {
        self.scale(rhs)
    }
}
