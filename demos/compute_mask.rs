//! Extract a watermark mask from a single video.
//!
//! Usage:
//! ```sh
//! cargo run --example compute_mask -- input.mp4 mask.png
//! ```

use std::env;
use std::process;

use video_watermark_mask::{save_mask, MaskEngine, ProcessOptions};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <video> <mask.png>", args[0]);
        process::exit(1);
    }

    let input = &args[1];
    let output = &args[2];

    let engine = MaskEngine::new();
    let opts = ProcessOptions::default();

    match engine.compute_mask(input.as_ref(), &opts) {
        Ok(mask) => {
            save_mask(&mask, output.as_ref()).expect("failed to save mask");
            println!("Mask written to {output}");
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
