// raptor-resize/src/main.rs
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use raptor_resize::cli::{self, Cli, Command};
use raptor_resize::prelude::*;
use raptor_resize::registry;
use raptor_resize::utils;

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .init();

    let outcome = match cli.command {
        Command::Resize(args) => run_resize(args),
        Command::Batch(args) => run_batch(args),
        Command::Info(args) => run_info(args),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Build a [`ResizeOptions`] from the shared dimension flags plus the
/// resize command's optional positional width/height.
fn build_options(dims: &cli::DimensionArgs, width_pos: Option<u32>, height_pos: Option<u32>) -> anyhow::Result<ResizeOptions> {
    let (mode, target_width, target_height, scale_percent) = cli::resolve_mode(dims, width_pos, height_pos);
    let options = ResizeOptions {
        mode,
        target_width,
        target_height,
        scale_percent,
        keep_aspect_ratio: !dims.no_aspect_ratio,
        overwrite_input: dims.overwrite,
        quality: dims.quality,
        filter: Filter::from(dims.filter),
    };
    options.validate()?;
    Ok(options)
}

fn run_resize(args: cli::ResizeArgs) -> anyhow::Result<bool> {
    let options = build_options(&args.dims, args.width_pos, args.height_pos)?;

    match process_one(&args.input, &args.output, &options, None) {
        Ok(()) => {
            println!("resized {} -> {}", args.input.display(), args.output.display());
            Ok(true)
        }
        Err(err) => {
            eprintln!("{}: {}", args.input.display(), err);
            Ok(false)
        }
    }
}

fn run_batch(args: cli::BatchArgs) -> anyhow::Result<bool> {
    let options = build_options(&args.dims, None, None)?;

    if !args.input_dir.is_dir() {
        anyhow::bail!("input directory does not exist: {}", args.input_dir.display());
    }
    utils::ensure_output_dir(&args.output_dir)?;

    let inputs: Vec<PathBuf> = utils::collect_image_paths(&args.input_dir)?;
    if inputs.is_empty() {
        log::warn!("no supported images found in {}", args.input_dir.display());
    }

    let batch_options = BatchOptions {
        num_threads: args.threads,
        stop_on_error: args.stop_on_error,
        max_speed: args.max_speed,
    };

    log::info!(
        "processing {} image(s) from {} ({} threads{})",
        inputs.len(),
        args.input_dir.display(),
        batch_options.resolved_threads(),
        if batch_options.max_speed { ", pipeline mode eligible" } else { "" },
    );

    let result = run_with_progress(inputs.len(), || {
        batch_resize(&inputs, &args.output_dir, &options, &batch_options)
    });

    println!(
        "done: {} total, {} succeeded, {} failed",
        result.total, result.success, result.failed
    );
    for error in &result.errors {
        eprintln!("  {error}");
    }

    Ok(result.failed == 0)
}

/// Run `work` to completion on a scoped worker thread while ticking an
/// `indicatif` spinner on the main thread, following the teacher's
/// `ProgressBar`/`ProgressStyle` usage in `batch.rs` — adapted to a
/// spinner rather than a `{bar}` template since the core's batch call
/// is a single blocking function with no per-item progress hook.
fn run_with_progress<T: Send>(total: usize, work: impl FnOnce() -> T + Send) -> T {
    use indicatif::{ProgressBar, ProgressStyle};
    use std::time::Duration;

    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {elapsed_precise} resizing {msg}")
            .expect("static spinner template is valid"),
    );
    bar.set_message(format!("{total} image(s)..."));
    bar.enable_steady_tick(Duration::from_millis(120));

    let result = std::thread::scope(|scope| scope.spawn(work).join().unwrap());

    bar.finish_and_clear();
    result
}

fn run_info(args: cli::InfoArgs) -> anyhow::Result<bool> {
    let info = registry::probe(&args.image)?;
    println!("width: {}", info.width);
    println!("height: {}", info.height);
    println!("channels: {}", info.channels);
    println!("format: {}", info.format);
    Ok(true)
}
