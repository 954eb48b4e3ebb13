//! Pure dimension-negotiation logic: source size + options -> target size.
//!
//! Nothing here touches the filesystem or a codec; every function is a
//! total function over its numeric inputs (modulo the one
//! `InvalidOptions` error case for genuinely unresolvable requests).

use crate::error::{CoreError, Result};

/// Resize mode, mirroring spec.md's four named modes as a closed enum
/// rather than a string tag (the teacher favors `ValueEnum`-style
/// enums over stringly-typed configuration).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    ScalePercent,
    FitWidth,
    FitHeight,
    ExactSize,
}

/// Resolve `(sw, sh)` + a mode/target pair into `(tw, th)`, both >= 1.
///
/// `scale_percent` is only consulted for `ResizeMode::ScalePercent`.
/// `target_width`/`target_height` are only consulted for the other
/// three modes, per §4.1.
pub fn resolve_dimensions(
    sw: u32,
    sh: u32,
    mode: ResizeMode,
    target_width: u32,
    target_height: u32,
    scale_percent: f64,
    keep_aspect_ratio: bool,
) -> Result<(u32, u32)> {
    if sw == 0 || sh == 0 {
        return Err(CoreError::InvalidOptions(
            "source dimensions must be non-zero".into(),
        ));
    }

    let (tw, th) = match mode {
        ResizeMode::ScalePercent => {
            if scale_percent <= 0.0 {
                return Err(CoreError::InvalidOptions(
                    "scale_percent must be > 0".into(),
                ));
            }
            let tw = (sw as f64 * scale_percent).round().max(1.0) as u32;
            let th = (sh as f64 * scale_percent).round().max(1.0) as u32;
            (tw, th)
        }
        ResizeMode::FitWidth => {
            if target_width == 0 {
                return Err(CoreError::InvalidOptions(
                    "fit-width requires target_width > 0".into(),
                ));
            }
            let tw = target_width;
            let th = if keep_aspect_ratio {
                ((sh as f64 * tw as f64 / sw as f64).round().max(1.0)) as u32
            } else {
                sh
            };
            (tw, th)
        }
        ResizeMode::FitHeight => {
            if target_height == 0 {
                return Err(CoreError::InvalidOptions(
                    "fit-height requires target_height > 0".into(),
                ));
            }
            let th = target_height;
            let tw = if keep_aspect_ratio {
                ((sw as f64 * th as f64 / sh as f64).round().max(1.0)) as u32
            } else {
                sw
            };
            (tw, th)
        }
        ResizeMode::ExactSize => {
            if target_width == 0 && target_height == 0 {
                return Err(CoreError::InvalidOptions(
                    "exact-size requires target_width and/or target_height > 0".into(),
                ));
            }
            if keep_aspect_ratio {
                if target_width == 0 || target_height == 0 {
                    return Err(CoreError::InvalidOptions(
                        "exact-size with aspect ratio requires both target dimensions".into(),
                    ));
                }
                let r = (target_width as f64 / sw as f64).min(target_height as f64 / sh as f64);
                let tw = (sw as f64 * r).round().max(1.0) as u32;
                let th = (sh as f64 * r).round().max(1.0) as u32;
                (tw, th)
            } else {
                let tw = if target_width > 0 { target_width } else { sw };
                let th = if target_height > 0 { target_height } else { sh };
                (tw, th)
            }
        }
    };

    Ok((tw.max(1), th.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_percent_halves_dimensions() {
        let (tw, th) = resolve_dimensions(100, 200, ResizeMode::ScalePercent, 0, 0, 0.5, true).unwrap();
        assert_eq!((tw, th), (50, 100));
    }

    #[test]
    fn scale_percent_clamps_to_one_pixel() {
        let (tw, th) = resolve_dimensions(100, 100, ResizeMode::ScalePercent, 0, 0, 0.00001, true).unwrap();
        assert_eq!((tw, th), (1, 1));
    }

    #[test]
    fn fit_width_preserves_aspect() {
        let (tw, th) = resolve_dimensions(2000, 1500, ResizeMode::FitWidth, 800, 0, 0.0, true).unwrap();
        assert_eq!((tw, th), (800, 600));
    }

    #[test]
    fn fit_height_preserves_aspect() {
        let (tw, th) = resolve_dimensions(2000, 1500, ResizeMode::FitHeight, 0, 600, 0.0, true).unwrap();
        assert_eq!((tw, th), (800, 600));
    }

    #[test]
    fn exact_size_fits_inside_preserving_ratio() {
        let (tw, th) = resolve_dimensions(2000, 1500, ResizeMode::ExactSize, 800, 800, 0.0, true).unwrap();
        assert_eq!((tw, th), (800, 600));
    }

    #[test]
    fn exact_size_without_aspect_is_literal() {
        let (tw, th) = resolve_dimensions(1920, 1080, ResizeMode::ExactSize, 640, 480, 0.0, false).unwrap();
        assert_eq!((tw, th), (640, 480));
    }

    #[test]
    fn fit_width_zero_target_is_invalid() {
        let err = resolve_dimensions(100, 100, ResizeMode::FitWidth, 0, 0, 0.0, true).unwrap_err();
        matches!(err, CoreError::InvalidOptions(_));
    }

    #[test]
    fn aspect_ratio_tolerance_holds_across_random_sizes() {
        for &(sw, sh, tw_target) in &[(1920u32, 1080u32, 500u32), (37, 991, 13), (4000, 3000, 777)] {
            let (tw, th) = resolve_dimensions(sw, sh, ResizeMode::FitWidth, tw_target, 0, 0.0, true).unwrap();
            let src_ratio = sw as f64 / sh as f64;
            let dst_ratio = tw as f64 / th as f64;
            let tol = 1.0 / (tw.min(th) as f64);
            assert!((src_ratio - dst_ratio).abs() <= tol + 1e-9, "ratio drifted for {sw}x{sh}->{tw}x{th}");
        }
    }
}
