//! MATLAB-compatible bicubic `imresize`
//!
//! Reproduces MATLAB's `imresize` sampling for the second NIQE scale. Uses a
//! Keys cubic kernel (a = -0.5) widened by `1 / scale` when shrinking with
//! antialiasing and symmetric padding at the borders. Rows are resampled
//! before columns.

use ndarray::{Array2, ArrayView2, Axis};

/// Support of the unscaled cubic kernel
const KERNEL_WIDTH: f64 = 4.0;

/// Keys cubic convolution kernel with a = -0.5
fn cubic(x: f64) -> f64 {
    let absx = x.abs();
    let absx2 = absx * absx;
    let absx3 = absx2 * absx;
    if absx <= 1.0 {
        1.5 * absx3 - 2.5 * absx2 + 1.0
    } else if absx <= 2.0 {
        -0.5 * absx3 + 2.5 * absx2 - 4.0 * absx + 2.0
    } else {
        0.0
    }
}

/// Symmetric (edge-inclusive) reflection of a zero-based index into `0..len`
fn reflect(index: isize, len: usize) -> usize {
    let period = 2 * len as isize;
    let m = index.rem_euclid(period);
    if m < len as isize {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

/// Source taps and normalized weights for one output sample
struct Contribution {
    indices: Vec<usize>,
    weights: Vec<f64>,
}

fn contributions(
    in_len: usize,
    out_len: usize,
    scale: f64,
    antialiasing: bool,
) -> Vec<Contribution> {
    let shrink_aa = scale < 1.0 && antialiasing;
    let kernel_width = if shrink_aa {
        KERNEL_WIDTH / scale
    } else {
        KERNEL_WIDTH
    };
    let taps = kernel_width.ceil() as usize + 2;

    (1..=out_len)
        .map(|i| {
            // Output sample i (1-based) maps to input coordinate u (1-based)
            let u = i as f64 / scale + 0.5 * (1.0 - 1.0 / scale);
            let left = (u - kernel_width / 2.0).floor();

            let mut indices = Vec::with_capacity(taps);
            let mut weights = Vec::with_capacity(taps);
            for k in 0..taps {
                let idx = left + k as f64;
                let distance = u - idx;
                let w = if shrink_aa {
                    scale * cubic(distance * scale)
                } else {
                    cubic(distance)
                };
                indices.push(reflect(idx as isize - 1, in_len));
                weights.push(w);
            }

            let sum: f64 = weights.iter().sum();
            weights.iter_mut().for_each(|w| *w /= sum);

            Contribution { indices, weights }
        })
        .collect()
}

fn resize_axis(image: &ArrayView2<f64>, axis: Axis, scale: f64, antialiasing: bool) -> Array2<f64> {
    let in_len = image.len_of(axis);
    let out_len = (in_len as f64 * scale).ceil() as usize;
    let plan = contributions(in_len, out_len, scale, antialiasing);

    let mut shape = image.raw_dim();
    shape[axis.index()] = out_len;
    let mut output = Array2::zeros(shape);

    for (mut out_lane, contrib) in output.axis_iter_mut(axis).zip(plan.iter()) {
        for (&idx, &w) in contrib.indices.iter().zip(contrib.weights.iter()) {
            if w == 0.0 {
                continue;
            }
            out_lane.scaled_add(w, &image.index_axis(axis, idx));
        }
    }

    output
}

/// Resize a single-channel image by `scale` in both dimensions
///
/// Output extent is `ceil(len * scale)` per axis. Values are not clamped or
/// rounded.
#[must_use]
pub fn imresize(image: &ArrayView2<f64>, scale: f64, antialiasing: bool) -> Array2<f64> {
    if image.is_empty() {
        return image.to_owned();
    }
    let rows_done = resize_axis(image, Axis(0), scale, antialiasing);
    resize_axis(&rows_done.view(), Axis(1), scale, antialiasing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_cubic_kernel() {
        assert_eq!(cubic(0.0), 1.0);
        assert_eq!(cubic(1.0), 0.0);
        assert_eq!(cubic(-2.0), 0.0);
        assert_eq!(cubic(2.5), 0.0);
        assert!((cubic(0.5) - 0.5625).abs() < 1e-12);
        assert!((cubic(1.5) + 0.0625).abs() < 1e-12);
    }

    #[test]
    fn test_reflect() {
        assert_eq!(reflect(-1, 5), 0);
        assert_eq!(reflect(-2, 5), 1);
        assert_eq!(reflect(0, 5), 0);
        assert_eq!(reflect(4, 5), 4);
        assert_eq!(reflect(5, 5), 4);
        assert_eq!(reflect(6, 5), 3);
        assert_eq!(reflect(3, 1), 0);
    }

    #[test]
    fn test_half_scale_shape() {
        let image = Array2::<f64>::zeros((192, 96));
        assert_eq!(imresize(&image.view(), 0.5, true).dim(), (96, 48));

        let odd = Array2::<f64>::zeros((7, 5));
        assert_eq!(imresize(&odd.view(), 0.5, true).dim(), (4, 3));
    }

    #[test]
    fn test_unit_scale_is_identity() {
        let image = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 10.0]];
        let result = imresize(&image.view(), 1.0, true);
        for (a, b) in result.iter().zip(image.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_preserved() {
        let image = Array2::from_elem((20, 30), 0.25);
        let result = imresize(&image.view(), 0.5, true);
        assert!(result.iter().all(|v| (v - 0.25).abs() < 1e-12));
    }

    #[test]
    fn test_linear_ramp_interior() {
        let image = Array2::from_shape_fn((16, 64), |(_, c)| c as f64);
        let result = imresize(&image.view(), 0.5, true);
        // Output column 9 (0-based) is centred on input coordinate 18.5
        for r in 0..result.nrows() {
            assert!((result[[r, 9]] - 18.5).abs() < 1e-9);
        }
    }
}
