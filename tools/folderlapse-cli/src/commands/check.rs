//! Check ffmpeg and encoder availability.

use folderlapse_common::config::{config_file_path, Defaults};
use folderlapse_render_engine::FfmpegSinkFactory;

/// FourCC codes worth reporting, in display order.
const KNOWN_FOURCCS: &[&str] = &[
    "mp4v", "avc1", "hev1", "mjpg", "xvid", "vp80", "vp90", "av01", "ffv1",
];

pub fn run(defaults: &Defaults) -> anyhow::Result<()> {
    println!("folderlapse System Check");
    println!("{}", "=".repeat(50));

    println!("Defaults file: {}", config_file_path().display());

    let factory = FfmpegSinkFactory::default();
    if !factory.is_available() {
        println!("[WARN] ffmpeg: not found on PATH");
        println!();
        println!("Install ffmpeg to render videos.");
        return Ok(());
    }
    println!("[OK] ffmpeg: found");

    println!();
    println!("Codecs:");
    for fourcc in KNOWN_FOURCCS {
        match factory.resolve_encoder(fourcc) {
            Ok(encoder) => println!("  [OK]   {fourcc:<5} -> {encoder}"),
            Err(e) => println!("  [MISS] {fourcc:<5} ({e})"),
        }
    }
    let default_ok = factory.resolve_encoder(&defaults.render.codec).is_ok();

    println!();
    if default_ok {
        println!(
            "Default codec '{}' is available. folderlapse is ready.",
            defaults.render.codec
        );
    } else {
        println!(
            "Default codec '{}' is not available. Pass --codec with one marked [OK].",
            defaults.render.codec
        );
    }

    Ok(())
}
