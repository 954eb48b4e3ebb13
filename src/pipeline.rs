//! Single-image pipeline: decode -> resize -> encode, plus the
//! process-wide last-error channel (§4.10) that batch callers can poll
//! after a failed job without threading an extra return path through
//! every layer.

use std::path::Path;
use std::sync::{Mutex, OnceLock};

use crate::error::{CoreError, Result};
use crate::geometry::resolve_dimensions;
use crate::kernel;
use crate::pool::BufferPool;
use crate::{registry, ResizeOptions};

/// True when `a` and `b` name the same file on disk. Falls back to a
/// literal path comparison when canonicalization fails (the output
/// path usually doesn't exist yet), which still catches the common
/// case of a caller passing the identical path twice.
pub(crate) fn paths_equal(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => a == b,
    }
}

fn last_error_slot() -> &'static Mutex<String> {
    static SLOT: OnceLock<Mutex<String>> = OnceLock::new();
    SLOT.get_or_init(|| Mutex::new(String::new()))
}

/// Overwrite the process-wide last-error message.
fn set_last_error(message: &str) {
    let mut slot = last_error_slot().lock().unwrap();
    *slot = message.to_string();
}

/// The most recent job failure's formatted message, empty if no job
/// has failed yet this process. Cleared by nothing — it's a sticky
/// diagnostic, not a queue.
pub fn last_error() -> String {
    last_error_slot().lock().unwrap().clone()
}

/// Run one full resize job: verify the input exists and is readable,
/// probe its format, resolve target geometry, decode, resize (through
/// `pool` if supplied, so concurrent callers share the scratch-buffer
/// free list), and encode to `output_path`.
///
/// On failure, also records the formatted message in the last-error
/// channel before returning the error, so callers that only track
/// aggregate counts can still recover a diagnostic afterward.
pub fn process_one(
    input_path: &Path,
    output_path: &Path,
    options: &ResizeOptions,
    pool: Option<&BufferPool>,
) -> Result<()> {
    match process_one_inner(input_path, output_path, options, pool) {
        Ok(()) => Ok(()),
        Err(err) => {
            set_last_error(&CoreError::for_path(input_path, err_clone(&err)));
            Err(err)
        }
    }
}

/// `CoreError` doesn't derive `Clone` (its `Io` variant wraps
/// `std::io::Error`, which isn't `Clone`); rebuild an equivalent error
/// from its display string for the last-error channel instead of
/// threading the original through twice.
fn err_clone(err: &CoreError) -> CoreError {
    CoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))
}

fn process_one_inner(
    input_path: &Path,
    output_path: &Path,
    options: &ResizeOptions,
    pool: Option<&BufferPool>,
) -> Result<()> {
    if !input_path.exists() {
        return Err(CoreError::FileNotFound(input_path.display().to_string()));
    }
    options.validate()?;

    if !options.overwrite_input && paths_equal(input_path, output_path) {
        return Err(CoreError::InvalidOptions(format!(
            "output path equals input path ({}) and overwrite_input is false",
            input_path.display()
        )));
    }

    let (src, _info) = registry::decode(input_path)?;

    let dims = resolve_dimensions(
        src.width,
        src.height,
        options.mode,
        options.target_width,
        options.target_height,
        options.scale_percent,
        options.keep_aspect_ratio,
    );
    let (tw, th) = match dims {
        Ok(dims) => dims,
        Err(err) => {
            release(pool, src.data);
            return Err(err);
        }
    };

    let resize_result = kernel::resize(pool, &src, tw, th, options.filter);
    // `src` is only an input to the kernel, never consumed by it;
    // release it back to the pool now regardless of outcome (§4.3
    // step 7).
    release(pool, src.data);
    let resized = resize_result?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            release(pool, resized.data);
            return Err(CoreError::WriteError(format!(
                "parent directory does not exist: {}",
                parent.display()
            )));
        }
    }

    let encode_result = registry::encode(output_path, &resized, options.quality);
    release(pool, resized.data);
    encode_result?;
    Ok(())
}

/// Return `buffer` to `pool`'s free list, a no-op when no pool was
/// supplied (e.g. non-batch callers that always allocate fresh).
fn release(pool: Option<&BufferPool>, buffer: Vec<u8>) {
    if let Some(pool) = pool {
        pool.release(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ResizeMode;
    use tempfile::tempdir;

    fn synth_png(dir: &Path, name: &str, w: u32, h: u32) -> std::path::PathBuf {
        let path = dir.join(name);
        let buf = crate::registry::synth_rgb(w, h);
        registry::encode(&path, &buf, 85).unwrap();
        path
    }

    #[test]
    fn processes_a_single_image_end_to_end() {
        let dir = tempdir().unwrap();
        let input = synth_png(dir.path(), "in.png", 64, 48);
        let output = dir.path().join("out.png");

        let options = ResizeOptions {
            mode: ResizeMode::ScalePercent,
            scale_percent: 0.5,
            ..ResizeOptions::default()
        };
        process_one(&input, &output, &options, None).unwrap();

        let (decoded, _) = registry::decode(&output).unwrap();
        assert_eq!(decoded.width, 32);
        assert_eq!(decoded.height, 24);
    }

    #[test]
    fn missing_input_is_file_not_found_and_sets_last_error() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("nope.png");
        let output = dir.path().join("out.png");
        let options = ResizeOptions::default();

        let err = process_one(&input, &output, &options, None).unwrap_err();
        matches!(err, CoreError::FileNotFound(_));
        assert!(last_error().contains("nope.png"));
    }

    #[test]
    fn invalid_options_are_rejected_before_touching_the_codec() {
        let dir = tempdir().unwrap();
        let input = synth_png(dir.path(), "in.png", 10, 10);
        let output = dir.path().join("out.png");
        let options = ResizeOptions {
            mode: ResizeMode::FitWidth,
            target_width: 0,
            ..ResizeOptions::default()
        };
        let err = process_one(&input, &output, &options, None).unwrap_err();
        matches!(err, CoreError::InvalidOptions(_));
    }

    #[test]
    fn same_input_and_output_path_is_rejected_without_overwrite() {
        let dir = tempdir().unwrap();
        let input = synth_png(dir.path(), "in.png", 10, 10);
        let options = ResizeOptions::default();
        let err = process_one(&input, &input, &options, None).unwrap_err();
        matches!(err, CoreError::InvalidOptions(_));
    }

    #[test]
    fn same_input_and_output_path_is_allowed_with_overwrite() {
        let dir = tempdir().unwrap();
        let input = synth_png(dir.path(), "in.png", 10, 10);
        let options = ResizeOptions {
            overwrite_input: true,
            mode: ResizeMode::ScalePercent,
            scale_percent: 0.5,
            ..ResizeOptions::default()
        };
        process_one(&input, &input, &options, None).unwrap();
        let (decoded, _) = registry::decode(&input).unwrap();
        assert_eq!(decoded.width, 5);
    }

    #[test]
    fn missing_output_parent_directory_is_a_write_error() {
        let dir = tempdir().unwrap();
        let input = synth_png(dir.path(), "in.png", 10, 10);
        let output = dir.path().join("missing_parent").join("out.png");
        let options = ResizeOptions::default();
        let err = process_one(&input, &output, &options, None).unwrap_err();
        matches!(err, CoreError::WriteError(_));
    }

    #[test]
    fn shares_the_pool_across_jobs() {
        let dir = tempdir().unwrap();
        let input = synth_png(dir.path(), "in.png", 64, 64);
        let output = dir.path().join("out.png");
        let pool = BufferPool::new();
        let options = ResizeOptions {
            mode: ResizeMode::ScalePercent,
            scale_percent: 0.25,
            ..ResizeOptions::default()
        };
        process_one(&input, &output, &options, Some(&pool)).unwrap();
        assert!(pool.len() > 0, "decode/resize buffers should be released back to the pool");
        process_one(&input, &output, &options, Some(&pool)).unwrap();
    }
}
