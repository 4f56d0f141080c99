use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use video_watermark_mask::{default_mask_path, MaskEngine, ProcessOptions, ProcessResult};

#[derive(Parser)]
#[command(
    name = "video-watermark-mask",
    about = "Locate static video watermarks via cross-frame gradient statistics",
    version,
    after_help = "Simple usage: video-watermark-mask <video>  (writes <name>_mask.png)\n\n\
                  NOTE: This tool only LOCATES the watermark. Feed the mask to an\n\
                  inpainting filter (e.g. ffmpeg's removelogo) to erase the pixels."
)]
struct Cli {
    /// Input video file or directory
    input: String,

    /// Output mask file or directory (default: {name}_mask.png)
    #[arg(short, long)]
    output: Option<String>,

    /// Maximum number of frames to sample
    #[arg(short = 'k', long = "keyframes", default_value = "50")]
    keyframes: usize,

    /// Seed for the deterministic keyframe shuffle
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.keyframes < 2 {
        eprintln!("Error: At least 2 sample frames are required");
        process::exit(1);
    }

    let opts = ProcessOptions {
        max_samples: cli.keyframes,
        seed: cli.seed,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    if !opts.quiet && opts.verbose {
        eprintln!(
            "Sampling up to {} keyframes per video (seed {})",
            opts.max_samples, opts.seed
        );
        eprintln!();
    }

    let engine = MaskEngine::new();

    let results = if input_path.is_dir() {
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: video-watermark-mask <input_dir> -o <output_dir>");
            process::exit(1);
        };
        engine.process_directory(input_path, &output_dir, &opts)
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_mask_path(input_path),
        };
        vec![engine.process_file(input_path, &output_path, &opts)]
    };

    let mut success_count = 0u32;
    let mut empty_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, &opts);
        if !r.success {
            fail_count += 1;
        } else if r.empty {
            empty_count += 1;
        } else {
            success_count += 1;
        }
    }

    if results.len() > 1 && !opts.quiet {
        eprintln!();
        eprint!("[Summary] Masks: {success_count}");
        if empty_count > 0 {
            eprint!(", No watermark: {empty_count}");
        }
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn print_result(result: &ProcessResult, opts: &ProcessOptions) {
    if opts.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if !result.success {
        eprintln!("[FAIL] {filename}: {}", result.message);
    } else if result.empty {
        if !opts.quiet {
            eprintln!("[SKIP] {filename}: {}", result.message);
        }
    } else if !opts.quiet {
        eprintln!(
            "[OK] {filename} ({:.1}% coverage)",
            result.coverage * 100.0
        );
    }

    if opts.verbose && result.success && !result.message.is_empty() {
        eprintln!("  -> {}", result.message);
    }
}
