//! Conversion of decoded images into the single-channel array NIQE scores
//!
//! Colour images are reduced to MATLAB-style BT.601 luma (or plain grey),
//! border pixels are optionally cropped, and values are rounded to integers
//! so results line up with the MATLAB reference.

use crate::config::{LumaMode, NiqeConfig};
use crate::error::{NiqeError, Result};
use image::DynamicImage;
use ndarray::{s, Array2};
use tracing::debug;

/// Reduce an image to one channel with values in [0, 255]
///
/// Images without colour channels are passed through unchanged; `mode` only
/// applies to RGB(A) inputs. Alpha is ignored.
#[must_use]
pub fn to_luma(image: &DynamicImage, mode: LumaMode) -> Array2<f64> {
    let (width, height) = (image.width() as usize, image.height() as usize);

    if !image.color().has_color() {
        let gray = image.to_luma32f();
        return Array2::from_shape_fn((height, width), |(y, x)| {
            f64::from(gray.get_pixel(x as u32, y as u32)[0]) * 255.0
        });
    }

    let rgb = image.to_rgb32f();
    Array2::from_shape_fn((height, width), |(y, x)| {
        let px = rgb.get_pixel(x as u32, y as u32);
        let r = f64::from(px[0]) * 255.0;
        let g = f64::from(px[1]) * 255.0;
        let b = f64::from(px[2]) * 255.0;
        match mode {
            LumaMode::Y => 16.0 + (65.481 * r + 128.553 * g + 24.966 * b) / 255.0,
            LumaMode::Gray => 0.299 * r + 0.587 * g + 0.114 * b,
        }
    })
}

/// Luma conversion, border crop and rounding as configured
///
/// # Errors
/// Returns `InvalidShape` if the border crop leaves no pixels
pub fn prepare(image: &DynamicImage, config: &NiqeConfig) -> Result<Array2<f64>> {
    let luma = to_luma(image, config.convert_to);
    let (h, w) = luma.dim();

    let border = config.crop_border;
    let mut prepared = if border == 0 {
        luma
    } else {
        if 2 * border >= h || 2 * border >= w {
            return Err(NiqeError::InvalidShape {
                shape: vec![h, w],
                block_size_h: config.block_size_h,
                block_size_w: config.block_size_w,
                reason: format!("crop border {border} removes the whole image"),
            });
        }
        luma.slice(s![border..h - border, border..w - border])
            .to_owned()
    };

    if config.round_pixels {
        // numpy rounds halves to even
        prepared.mapv_inplace(f64::round_ties_even);
    }

    debug!(
        "Prepared {}x{} image as {:?} luma, crop border {}",
        w,
        h,
        config.convert_to,
        border
    );
    Ok(prepared)
}
