//! Spatial convolution with edge replication.
//!
//! Every channel is filtered on its own. Source coordinates that fall
//! outside the image are clamped to the nearest edge pixel, so the output
//! always keeps the input dimensions. Rows are computed in parallel; each
//! output row only reads the shared source so the result does not depend on
//! scheduling.

use crate::{buffer::PixelBuffer, kernel::Kernel};
use rayon::prelude::*;

/// Convolve with `kernel`, taking the two-pass path when the kernel carries
/// a separable factor.
pub fn convolve(buffer: &PixelBuffer, kernel: &Kernel) -> PixelBuffer {
    match kernel.separable() {
        Some(factor) => convolve_separable(buffer, factor, kernel.normalization(), kernel.bias()),
        None => convolve_2d(buffer, kernel),
    }
}

/// Direct 2D form: `round(sum / normalization + bias)` clamped to `[0, 255]`.
pub fn convolve_2d(buffer: &PixelBuffer, kernel: &Kernel) -> PixelBuffer {
    let width = buffer.width() as usize;
    let height = buffer.height() as usize;
    let channels = buffer.channels().count();
    let stride = buffer.stride();
    let size = kernel.size();
    let radius = kernel.radius() as isize;
    let src = buffer.samples();

    let mut out = vec![0u8; src.len()];
    out.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width {
                for c in 0..channels {
                    let mut sum = 0.0f32;
                    for ky in 0..size {
                        let sy = clamp_index(y as isize + ky as isize - radius, height);
                        let src_row = &src[sy * stride..(sy + 1) * stride];
                        for kx in 0..size {
                            let sx = clamp_index(x as isize + kx as isize - radius, width);
                            sum += src_row[sx * channels + c] as f32 * kernel.weight(kx, ky);
                        }
                    }
                    row[x * channels + c] = finish(sum, kernel.normalization(), kernel.bias());
                }
            }
        });

    buffer.with_samples(out)
}

/// Horizontal then vertical pass with the same 1D factor. The intermediate
/// stays in `f32`, only the final value is rounded.
pub fn convolve_separable(
    buffer: &PixelBuffer,
    factor: &[f32],
    normalization: f32,
    bias: f32,
) -> PixelBuffer {
    let width = buffer.width() as usize;
    let height = buffer.height() as usize;
    let channels = buffer.channels().count();
    let stride = buffer.stride();
    let radius = (factor.len() / 2) as isize;
    let src = buffer.samples();

    let mut temp = vec![0.0f32; src.len()];
    temp.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let src_row = &src[y * stride..(y + 1) * stride];
            for x in 0..width {
                for c in 0..channels {
                    let mut sum = 0.0f32;
                    for (k, &w) in factor.iter().enumerate() {
                        let sx = clamp_index(x as isize + k as isize - radius, width);
                        sum += src_row[sx * channels + c] as f32 * w;
                    }
                    row[x * channels + c] = sum;
                }
            }
        });

    let mut out = vec![0u8; src.len()];
    out.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            for i in 0..stride {
                let mut sum = 0.0f32;
                for (k, &w) in factor.iter().enumerate() {
                    let sy = clamp_index(y as isize + k as isize - radius, height);
                    sum += temp[sy * stride + i] * w;
                }
                row[i] = finish(sum, normalization, bias);
            }
        });

    buffer.with_samples(out)
}

#[inline]
fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

#[inline]
fn finish(sum: f32, normalization: f32, bias: f32) -> u8 {
    (sum / normalization + bias).round().clamp(0.0, 255.0) as u8
}
