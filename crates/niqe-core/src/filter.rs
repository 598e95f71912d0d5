//! Same-size 2D convolution with edge replication
//!
//! Used for the local mean and variance maps of the normalization step.

use ndarray::{Array2, ArrayView2};

/// Convolve `image` with `kernel`, replicating edge pixels outside the image
///
/// This is a true convolution (the kernel is flipped) with the kernel centre
/// at `(kh / 2, kw / 2)`; the output has the same shape as the input.
#[must_use]
pub fn convolve_nearest(image: &ArrayView2<f64>, kernel: &ArrayView2<f64>) -> Array2<f64> {
    let (img_rows, img_cols) = image.dim();
    let (ker_rows, ker_cols) = kernel.dim();

    if img_rows == 0 || img_cols == 0 {
        return Array2::zeros((img_rows, img_cols));
    }

    let center_r = (ker_rows / 2) as isize;
    let center_c = (ker_cols / 2) as isize;
    let max_r = img_rows as isize - 1;
    let max_c = img_cols as isize - 1;

    let mut output = Array2::zeros((img_rows, img_cols));

    for i in 0..img_rows {
        for j in 0..img_cols {
            let mut sum = 0.0;

            for ki in 0..ker_rows {
                let src_r = (i as isize + center_r - ki as isize).clamp(0, max_r) as usize;
                for kj in 0..ker_cols {
                    let src_c = (j as isize + center_c - kj as isize).clamp(0, max_c) as usize;
                    sum += image[[src_r, src_c]] * kernel[[ki, kj]];
                }
            }

            output[[i, j]] = sum;
        }
    }

    output
}

/// Create a normalized Gaussian kernel
///
/// The NIQE window is `gaussian_window(7, 7.0 / 6.0)`.
///
/// # Panics
/// Panics if `size` is even
#[must_use]
pub fn gaussian_window(size: usize, sigma: f64) -> Array2<f64> {
    assert!(size % 2 == 1, "Kernel size must be odd");

    let center = (size / 2) as f64;
    let mut kernel = Array2::from_shape_fn((size, size), |(i, j)| {
        let y = i as f64 - center;
        let x = j as f64 - center;
        (-(x * x + y * y) / (2.0 * sigma * sigma)).exp()
    });

    let sum = kernel.sum();
    if sum > 0.0 {
        kernel.mapv_inplace(|x| x / sum);
    }

    kernel
}
