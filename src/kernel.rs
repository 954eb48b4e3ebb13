//! Resize kernel driver: glues the decoded [`PixelBuffer`] to
//! `fast_image_resize`'s polyphase convolution kernels.
//!
//! Grounded on `moreWax-cap/cap-scale/src/cpu.rs`, which drives the
//! same `fast_image_resize` crate (`Resizer`, `ResizeOptions`,
//! `ResizeAlg::Convolution`) for a single hardcoded BGRA8 case; this
//! module generalizes that to all four channel counts the decoder can
//! produce and to all four spec filters instead of one fixed
//! `CatmullRom`.

use fast_image_resize as fir;
use fir::images::Image;
use fir::{FilterType, PixelType, ResizeAlg, ResizeOptions as FirResizeOptions, Resizer};

use crate::error::{CoreError, Result};
use crate::pool::BufferPool;
use crate::{Filter, PixelBuffer};

/// Downscale ratio beyond which the default filter is swapped for the
/// cheaper `Box` kernel (§4.4).
const AUTO_DOWNGRADE_RATIO: f64 = 3.0;

/// Apply the auto-downgrade rule: substitutes `Box` for `Mitchell`
/// past a 3x downscale, and never touches a filter other than
/// `Mitchell` (the default). This is a pure function so the §8
/// "auto-filter idempotence" property can be tested directly against
/// it without driving a real resize.
pub fn choose_filter(sw: u32, sh: u32, tw: u32, th: u32, requested: Filter) -> Filter {
    if requested != Filter::Mitchell {
        return requested;
    }
    let d = (sw as f64 / tw as f64).max(sh as f64 / th as f64);
    if d >= AUTO_DOWNGRADE_RATIO {
        Filter::Box
    } else {
        Filter::Mitchell
    }
}

fn filter_type_for(filter: Filter) -> FilterType {
    match filter {
        Filter::Mitchell => FilterType::Mitchell,
        Filter::CatmullRom => FilterType::CatmullRom,
        Filter::Box => FilterType::Box,
        Filter::Triangle => FilterType::Bilinear,
    }
}

/// Resize `src` to `(target_width, target_height)`, preserving
/// channel count. Applies the auto-downgrade rule internally. The
/// caller-provided `pool` supplies the destination scratch buffer
/// (§4.5) rather than a fresh allocation per job; pass `None` to
/// always allocate (used by tests and by callers outside a batch).
pub fn resize(
    pool: Option<&BufferPool>,
    src: &PixelBuffer,
    target_width: u32,
    target_height: u32,
    filter: Filter,
) -> Result<PixelBuffer> {
    if target_width == 0 || target_height == 0 {
        return Err(CoreError::InvalidOptions(
            "target dimensions must be >= 1".into(),
        ));
    }
    let chosen = choose_filter(src.width, src.height, target_width, target_height, filter);
    let filter_type = filter_type_for(chosen);
    let opts = FirResizeOptions::new()
        .resize_alg(ResizeAlg::Convolution(filter_type))
        .use_alpha(src.channels == 4);

    let mut resizer = Resizer::new();

    let dst_data = match src.channels {
        1 => resize_plane(pool, &mut resizer, &src.data, src.width, src.height, target_width, target_height, PixelType::U8, &opts)?,
        2 => resize_plane(pool, &mut resizer, &src.data, src.width, src.height, target_width, target_height, PixelType::U8x2, &opts)?,
        4 => resize_plane(pool, &mut resizer, &src.data, src.width, src.height, target_width, target_height, PixelType::U8x4, &opts)?,
        3 => {
            // 3-channel pixels are padded to 4-channel raw before the
            // kernel runs: bypassing alpha premultiplication this way
            // is bitwise-identical to a native 3-channel path since no
            // alpha exists, and it reuses the same U8x4 kernel path as
            // the 4-channel case (§4.4).
            let padded = pad_rgb_to_rgbx(&src.data);
            let padded_dst = resize_plane(pool, &mut resizer, &padded, src.width, src.height, target_width, target_height, PixelType::U8x4, &opts)?;
            let rgb = unpad_rgbx_to_rgb(&padded_dst);
            if let Some(pool) = pool {
                pool.release(padded_dst);
            }
            rgb
        }
        other => {
            return Err(CoreError::InvalidOptions(format!(
                "unsupported channel count: {other}"
            )))
        }
    };

    Ok(PixelBuffer::new(target_width, target_height, src.channels, dst_data))
}

#[allow(clippy::too_many_arguments)]
fn resize_plane(
    pool: Option<&BufferPool>,
    resizer: &mut Resizer,
    src_data: &[u8],
    sw: u32,
    sh: u32,
    tw: u32,
    th: u32,
    pixel_type: PixelType,
    opts: &FirResizeOptions,
) -> Result<Vec<u8>> {
    let src_image = Image::from_vec_u8(sw, sh, src_data.to_vec(), pixel_type)
        .map_err(|e| CoreError::ResizeError(e.to_string()))?;

    let bytes_per_pixel = match pixel_type {
        PixelType::U8 => 1,
        PixelType::U8x2 => 2,
        PixelType::U8x4 => 4,
        _ => unreachable!("kernel only drives U8/U8x2/U8x4 paths"),
    };
    let dst_len = tw as usize * th as usize * bytes_per_pixel;
    let dst_buf = match pool {
        Some(pool) => pool.acquire(dst_len),
        None => vec![0u8; dst_len],
    };
    let mut dst_image = Image::from_vec_u8(tw, th, dst_buf, pixel_type)
        .map_err(|e| CoreError::ResizeError(e.to_string()))?;

    resizer
        .resize(&src_image, &mut dst_image, opts)
        .map_err(|e| CoreError::ResizeError(e.to_string()))?;

    Ok(dst_image.into_vec())
}

fn pad_rgb_to_rgbx(data: &[u8]) -> Vec<u8> {
    let n = data.len() / 3;
    let mut out = Vec::with_capacity(n * 4);
    for px in data.chunks_exact(3) {
        out.extend_from_slice(px);
        out.push(0xFF);
    }
    out
}

fn unpad_rgbx_to_rgb(data: &[u8]) -> Vec<u8> {
    let n = data.len() / 4;
    let mut out = Vec::with_capacity(n * 3);
    for px in data.chunks_exact(4) {
        out.extend_from_slice(&px[0..3]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_mitchell_below_downgrade_threshold() {
        let chosen = choose_filter(900, 900, 400, 400, Filter::Mitchell);
        assert_eq!(chosen, Filter::Mitchell);
    }

    #[test]
    fn downgrades_to_box_past_threshold() {
        let chosen = choose_filter(3000, 3000, 500, 500, Filter::Mitchell);
        assert_eq!(chosen, Filter::Box);
    }

    #[test]
    fn explicit_non_default_filter_is_preserved() {
        let chosen = choose_filter(3000, 3000, 500, 500, Filter::CatmullRom);
        assert_eq!(chosen, Filter::CatmullRom);
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        // d == 3.0 exactly must downgrade ("d >= 3.0").
        let chosen = choose_filter(300, 300, 100, 100, Filter::Mitchell);
        assert_eq!(chosen, Filter::Box);
    }

    #[test]
    fn resize_rgb_preserves_channel_count() {
        let src = crate::registry::synth_rgb(64, 48);
        let out = resize(None, &src, 32, 24, Filter::Mitchell).unwrap();
        assert_eq!(out.channels, 3);
        assert_eq!(out.width, 32);
        assert_eq!(out.height, 24);
        assert_eq!(out.data.len(), 32 * 24 * 3);
    }

    #[test]
    fn resize_rgba_preserves_channel_count() {
        let mut data = vec![0u8; 20 * 10 * 4];
        for (i, b) in data.iter_mut().enumerate() {
            *b = (i % 256) as u8;
        }
        let src = PixelBuffer::new(20, 10, 4, data);
        let out = resize(None, &src, 10, 5, Filter::CatmullRom).unwrap();
        assert_eq!(out.channels, 4);
        assert_eq!(out.data.len(), 10 * 5 * 4);
    }

    #[test]
    fn zero_target_dimension_is_invalid() {
        let src = crate::registry::synth_rgb(8, 8);
        let err = resize(None, &src, 0, 4, Filter::Mitchell).unwrap_err();
        matches!(err, CoreError::InvalidOptions(_));
    }

    #[test]
    fn determinism_same_input_same_options_same_bytes() {
        let src = crate::registry::synth_rgb(50, 40);
        let a = resize(None, &src, 20, 16, Filter::Mitchell).unwrap();
        let b = resize(None, &src, 20, 16, Filter::Mitchell).unwrap();
        assert_eq!(a.data, b.data);
    }
}
