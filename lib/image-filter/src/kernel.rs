//! Square convolution kernels.

use crate::{FilterError, Result};
use std::borrow::Cow;

/// Largest accepted kernel side.
pub const MAX_KERNEL_SIZE: usize = 255;

/// Odd-sized square weight matrix, stored row by row. Row index is the
/// vertical offset, column index the horizontal one.
///
/// `normalization` is the sum of the weights, or `1.0` when they sum to
/// zero. `bias` is added after dividing by it.
///
/// Separable kernels only keep their 1D factor; the dense matrix is the
/// outer product of it with itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    size: usize,
    weights: Vec<f32>,
    normalization: f32,
    bias: f32,
    separable: Option<Vec<f32>>,
}

impl Kernel {
    pub fn new(size: usize, weights: Vec<f32>) -> Result<Self> {
        check_size(size)?;

        if weights.len() != size * size {
            return Err(FilterError::InvalidKernel(format!(
                "expected {} weights for a {size}x{size} kernel, got {}",
                size * size,
                weights.len()
            )));
        }

        Ok(Self::build(size, weights))
    }

    pub fn from_rows<const N: usize>(rows: [[f32; N]; N]) -> Result<Self> {
        Self::new(N, rows.iter().flatten().copied().collect())
    }

    /// 3x3 kernels are always well-formed.
    pub fn square3(rows: [[f32; 3]; 3]) -> Self {
        Self::build(3, rows.iter().flatten().copied().collect())
    }

    fn build(size: usize, weights: Vec<f32>) -> Self {
        let sum: f32 = weights.iter().sum();
        let normalization = if sum.abs() < f32::EPSILON { 1.0 } else { sum };

        Self {
            size,
            weights,
            normalization,
            bias: 0.0,
            separable: None,
        }
    }

    pub fn with_bias(mut self, bias: f32) -> Self {
        self.bias = bias;
        self
    }

    /// Kernel that reproduces its input.
    pub fn identity() -> Self {
        Self::square3([[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]])
    }

    /// Normalized Gaussian of the given odd size. Sigma follows the usual
    /// size-derived rule `0.3 * ((size - 1) * 0.5 - 1) + 0.8`.
    ///
    /// The 1D factor is kept so the convolution can run as two passes.
    pub fn gaussian(size: usize) -> Result<Self> {
        check_size(size)?;
        Ok(Self::gaussian_odd(size))
    }

    /// Gaussian for a size already known to be odd; even sizes are bumped
    /// to the next odd one.
    pub(crate) fn gaussian_odd(size: usize) -> Self {
        let size = size | 1;
        let factor = gaussian_1d(size, gaussian_sigma(size));

        Self {
            size,
            weights: vec![],
            normalization: 1.0,
            bias: 0.0,
            separable: Some(factor),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn radius(&self) -> usize {
        self.size / 2
    }

    /// Row-major weights. Built on demand for separable kernels.
    pub fn weights(&self) -> Cow<'_, [f32]> {
        match &self.separable {
            Some(factor) => Cow::Owned(
                factor
                    .iter()
                    .flat_map(|wy| factor.iter().map(move |wx| wy * wx))
                    .collect(),
            ),
            None => Cow::Borrowed(&self.weights),
        }
    }

    pub fn weight(&self, kx: usize, ky: usize) -> f32 {
        match &self.separable {
            Some(factor) => factor[ky] * factor[kx],
            None => self.weights[ky * self.size + kx],
        }
    }

    pub fn normalization(&self) -> f32 {
        self.normalization
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }

    pub fn separable(&self) -> Option<&[f32]> {
        self.separable.as_deref()
    }
}

fn check_size(size: usize) -> Result<()> {
    if size == 0 || size % 2 == 0 {
        return Err(FilterError::InvalidKernel(format!(
            "size must be odd, got {size}"
        )));
    }

    if size > MAX_KERNEL_SIZE {
        return Err(FilterError::InvalidKernel(format!(
            "size {size} exceeds the {MAX_KERNEL_SIZE} limit"
        )));
    }

    Ok(())
}

pub fn gaussian_sigma(size: usize) -> f32 {
    0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

fn gaussian_1d(size: usize, sigma: f32) -> Vec<f32> {
    let half = (size / 2) as f32;
    let mut factor: Vec<f32> = (0..size)
        .map(|i| {
            let x = i as f32 - half;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();

    let sum: f32 = factor.iter().sum();
    for v in factor.iter_mut() {
        *v /= sum;
    }

    factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_even_size() {
        assert!(matches!(
            Kernel::new(2, vec![1.0; 4]),
            Err(FilterError::InvalidKernel(_))
        ));
        assert!(Kernel::gaussian(4).is_err());
    }

    #[test]
    fn test_rejects_wrong_weight_count() {
        assert!(Kernel::new(3, vec![1.0; 8]).is_err());
    }

    #[test]
    fn test_rejects_oversized_gaussian() {
        assert!(Kernel::gaussian(MAX_KERNEL_SIZE).is_ok());
        assert!(matches!(
            Kernel::gaussian(MAX_KERNEL_SIZE + 2),
            Err(FilterError::InvalidKernel(_))
        ));
        assert!(Kernel::gaussian(1_000_001).is_err());
    }

    #[test]
    fn test_separable_keeps_only_factor() {
        let kernel = Kernel::gaussian(MAX_KERNEL_SIZE).unwrap();
        assert!(kernel.weights.is_empty());
        assert_eq!(kernel.separable().map(|f| f.len()), Some(MAX_KERNEL_SIZE));

        let factor = kernel.separable().unwrap();
        assert_eq!(kernel.weight(3, 7), factor[7] * factor[3]);
    }

    #[test]
    fn test_zero_sum_normalizes_to_one() {
        let kernel = Kernel::from_rows([[0.0, -1.0, -1.0], [1.0, 0.0, -1.0], [1.0, 1.0, 0.0]]).unwrap();
        assert_eq!(kernel.normalization(), 1.0);
        assert_eq!(kernel.bias(), 0.0);
    }

    #[test]
    fn test_normalization_is_weight_sum() {
        let kernel = Kernel::new(3, vec![1.0; 9]).unwrap().with_bias(4.0);
        assert_eq!(kernel.normalization(), 9.0);
        assert_eq!(kernel.bias(), 4.0);
        assert_eq!(kernel.radius(), 1);
    }

    #[test]
    fn test_gaussian_weights_sum_to_one() {
        let kernel = Kernel::gaussian(35).unwrap();
        let sum: f32 = kernel.weights().iter().sum();

        assert_eq!(kernel.size(), 35);
        assert!((sum - 1.0).abs() < 1e-4);
        assert!((gaussian_sigma(35) - 5.6).abs() < 1e-5);

        // Peak in the middle, symmetric.
        let center = kernel.weight(17, 17);
        assert!(kernel.weights().iter().all(|&w| w <= center));
        assert_eq!(kernel.weight(0, 17), kernel.weight(34, 17));
        assert_eq!(kernel.separable().map(|f| f.len()), Some(35));
    }
}
