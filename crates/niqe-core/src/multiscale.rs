//! Two-scale block feature extraction
//!
//! The image is cropped to whole blocks, locally normalized, and cut into a
//! grid of non-overlapping blocks whose features form one row each. This
//! happens twice: at full resolution and after a single MATLAB-style 0.5x
//! down-sample. The block grid is fixed by the full-resolution image, so
//! both scales produce the same number of rows and the results concatenate
//! into a `blocks x 36` distortion matrix.

use crate::error::{NiqeError, Result};
use crate::features::{compute_feature, FEATURES_PER_SCALE};
use crate::filter::convolve_nearest;
use crate::resize::imresize;
use ndarray::{concatenate, s, Array2, ArrayView2, Axis};
use tracing::debug;

/// Number of columns in the two-scale distortion matrix
pub const DISTORTION_FEATURES: usize = 2 * FEATURES_PER_SCALE;

/// Block grid of an image: `(num_block_h, num_block_w)`
///
/// # Errors
/// Returns `InvalidConfig` for zero block sizes and `InvalidShape` when the
/// image cannot hold a single block
pub fn block_grid(
    shape: (usize, usize),
    block_size_h: usize,
    block_size_w: usize,
) -> Result<(usize, usize)> {
    if block_size_h == 0 || block_size_w == 0 {
        return Err(NiqeError::InvalidConfig(format!(
            "block size must be non-zero, got {block_size_h}x{block_size_w}"
        )));
    }

    let (h, w) = shape;
    let num_block_h = h / block_size_h;
    let num_block_w = w / block_size_w;
    if num_block_h == 0 || num_block_w == 0 {
        return Err(NiqeError::InvalidShape {
            shape: vec![h, w],
            block_size_h,
            block_size_w,
            reason: "image is smaller than one block".to_string(),
        });
    }

    Ok((num_block_h, num_block_w))
}

/// Divisive normalization by the Gaussian-weighted local mean and deviation
///
/// `(image - mu) / (sigma + 1)` where `mu = image * window` and
/// `sigma = sqrt(|image² * window - mu²|)`.
#[must_use]
pub fn local_normalize(image: &ArrayView2<f64>, window: &ArrayView2<f64>) -> Array2<f64> {
    let mu = convolve_nearest(image, window);
    let squared = image.mapv(|x| x * x);
    let mut sigma = convolve_nearest(&squared.view(), window);
    sigma.zip_mut_with(&mu, |s, &m| *s = (*s - m * m).abs().sqrt());

    let mut normalized = image.to_owned();
    ndarray::Zip::from(&mut normalized)
        .and(&mu)
        .and(&sigma)
        .for_each(|x, &m, &s| *x = (*x - m) / (s + 1.0));
    normalized
}

/// Image currently being analysed and the scale it belongs to
///
/// The only transition is `AtScale1 -> AtScale2`, which down-samples the
/// full-resolution image once.
enum ScaleState {
    AtScale1(Array2<f64>),
    AtScale2(Array2<f64>),
}

impl ScaleState {
    fn divisor(&self) -> usize {
        match self {
            ScaleState::AtScale1(_) => 1,
            ScaleState::AtScale2(_) => 2,
        }
    }

    fn image(&self) -> &Array2<f64> {
        match self {
            ScaleState::AtScale1(image) | ScaleState::AtScale2(image) => image,
        }
    }

    fn advance(self) -> Option<Self> {
        match self {
            ScaleState::AtScale1(image) => Some(ScaleState::AtScale2(half_scale(&image.view()))),
            ScaleState::AtScale2(_) => None,
        }
    }
}

/// Down-sample by 0.5 in the [0, 1] range the pristine model was built with
fn half_scale(image: &ArrayView2<f64>) -> Array2<f64> {
    let unit = image.mapv(|x| x / 255.0);
    let mut resized = imresize(&unit.view(), 0.5, true);
    resized.mapv_inplace(|x| x * 255.0);
    resized
}

/// Features of every block of one normalized image, one row per block
///
/// Rows are ordered column-major over the block grid. Block `(h, w)` spans
/// rows `h * block_size_h / divisor .. (h + 1) * block_size_h / divisor`
/// (and likewise for columns).
fn scale_features(
    normalized: &ArrayView2<f64>,
    grid: (usize, usize),
    block_size: (usize, usize),
    divisor: usize,
) -> Array2<f64> {
    let (num_block_h, num_block_w) = grid;
    let (block_size_h, block_size_w) = block_size;
    let mut feat = Array2::zeros((num_block_h * num_block_w, FEATURES_PER_SCALE));

    let mut row = 0;
    for idx_w in 0..num_block_w {
        for idx_h in 0..num_block_h {
            let block = normalized.slice(s![
                idx_h * block_size_h / divisor..(idx_h + 1) * block_size_h / divisor,
                idx_w * block_size_w / divisor..(idx_w + 1) * block_size_w / divisor
            ]);
            let values = compute_feature(&block);
            feat.row_mut(row)
                .iter_mut()
                .zip(values)
                .for_each(|(dst, v)| *dst = v);
            row += 1;
        }
    }

    feat
}

/// Build the two-scale distortion matrix of an image
///
/// The image is cropped to `num_block_h * block_size_h` rows and
/// `num_block_w * block_size_w` columns before anything else. The returned
/// matrix has `num_block_h * num_block_w` rows and [`DISTORTION_FEATURES`]
/// columns; degenerate blocks leave NaN entries in their row.
///
/// # Errors
/// Returns `InvalidShape` when the image is smaller than one block and
/// `InvalidConfig` for zero block sizes
pub fn distortion_params(
    image: &ArrayView2<f64>,
    window: &ArrayView2<f64>,
    block_size_h: usize,
    block_size_w: usize,
) -> Result<Array2<f64>> {
    let grid = block_grid(image.dim(), block_size_h, block_size_w)?;
    let (num_block_h, num_block_w) = grid;

    let cropped = image
        .slice(s![..num_block_h * block_size_h, ..num_block_w * block_size_w])
        .to_owned();
    debug!(
        "Cropped {:?} image to {:?} ({}x{} blocks)",
        image.dim(),
        cropped.dim(),
        num_block_h,
        num_block_w
    );

    let mut per_scale = Vec::with_capacity(2);
    let mut state = Some(ScaleState::AtScale1(cropped));
    while let Some(current) = state {
        let divisor = current.divisor();
        let normalized = local_normalize(&current.image().view(), window);
        let feat = scale_features(
            &normalized.view(),
            grid,
            (block_size_h, block_size_w),
            divisor,
        );
        debug!(
            "Scale {}: image {:?}, features {:?}",
            divisor,
            current.image().dim(),
            feat.dim()
        );
        per_scale.push(feat);
        state = current.advance();
    }

    let views: Vec<ArrayView2<f64>> = per_scale.iter().map(|f| f.view()).collect();
    let distparam = concatenate(Axis(1), &views)
        .map_err(|e| NiqeError::InvalidShape {
            shape: vec![image.nrows(), image.ncols()],
            block_size_h,
            block_size_w,
            reason: format!("per-scale feature matrices do not align: {e}"),
        })?;

    Ok(distparam)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::gaussian_window;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn noise_image(h: usize, w: usize, seed: u64) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array2::from_shape_fn((h, w), |_| rng.random_range(0.0..255.0))
    }

    #[test]
    fn test_block_grid() {
        assert_eq!(block_grid((192, 192), 96, 96).unwrap(), (2, 2));
        assert_eq!(block_grid((300, 200), 96, 96).unwrap(), (3, 2));
        assert!(matches!(
            block_grid((50, 50), 96, 96),
            Err(NiqeError::InvalidShape { .. })
        ));
        assert!(matches!(
            block_grid((200, 95), 96, 96),
            Err(NiqeError::InvalidShape { .. })
        ));
        assert!(matches!(
            block_grid((200, 200), 0, 96),
            Err(NiqeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_local_normalize_constant_image() {
        let image = Array2::from_elem((16, 16), 128.0);
        let window = gaussian_window(7, 7.0 / 6.0);
        let normalized = local_normalize(&image.view(), &window.view());
        assert!(normalized.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_local_normalize_offset_invariant() {
        let image = noise_image(32, 32, 1);
        let shifted = image.mapv(|x| x + 40.0);
        let window = gaussian_window(7, 7.0 / 6.0);
        let a = local_normalize(&image.view(), &window.view());
        let b = local_normalize(&shifted.view(), &window.view());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_scale_state_transitions_once() {
        let state = ScaleState::AtScale1(Array2::zeros((96, 192)));
        assert_eq!(state.divisor(), 1);

        let state = state.advance().unwrap();
        assert_eq!(state.divisor(), 2);
        assert_eq!(state.image().dim(), (48, 96));

        assert!(state.advance().is_none());
    }

    #[test]
    fn test_distortion_params_shape() {
        let image = noise_image(192, 192, 9);
        let window = gaussian_window(7, 7.0 / 6.0);
        let distparam = distortion_params(&image.view(), &window.view(), 96, 96).unwrap();
        assert_eq!(distparam.dim(), (4, DISTORTION_FEATURES));
    }

    #[test]
    fn test_distortion_params_crops_remainder() {
        let image = noise_image(130, 250, 5);
        let window = gaussian_window(7, 7.0 / 6.0);
        let distparam = distortion_params(&image.view(), &window.view(), 64, 64).unwrap();
        // 2 x 3 blocks, column-major
        assert_eq!(distparam.dim(), (6, DISTORTION_FEATURES));
    }

    #[test]
    fn test_block_order_is_column_major() {
        // Left third noisy, rest zero: blocks far from the noise normalize to
        // exact zeros and have NaN scales
        let mut image = noise_image(64, 96, 11);
        image.slice_mut(s![.., 32..]).fill(0.0);
        let window = gaussian_window(7, 7.0 / 6.0);
        let distparam = distortion_params(&image.view(), &window.view(), 32, 32).unwrap();
        assert_eq!(distparam.nrows(), 6);

        // Rows 0,1 are block column 0 (noisy), rows 4,5 block column 2 (flat)
        assert!(distparam.row(0).iter().all(|v| v.is_finite()));
        assert!(distparam.row(1).iter().all(|v| v.is_finite()));
        assert!(distparam[[4, 1]].is_nan());
        assert!(distparam[[5, 1]].is_nan());
    }

    #[test]
    fn test_too_small_image() {
        let image = noise_image(50, 50, 2);
        let window = gaussian_window(7, 7.0 / 6.0);
        let result = distortion_params(&image.view(), &window.view(), 96, 96);
        assert!(matches!(result, Err(NiqeError::InvalidShape { .. })));
    }
}
