//! Render one timelapse video per source folder.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveTime;
use clap::Args;
use folderlapse_common::config::Defaults;
use folderlapse_frame_model::filter::{parse_time_of_day, parse_weekdays, FrameFilter, TimeWindow};
use folderlapse_frame_model::job::{normalize_extensions, JobConfig, JobStage};
use folderlapse_render_engine::{run as run_jobs, FfmpegSinkFactory, JobProgress, ProgressCallback};

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Root directory holding one folder per day (or the images directly)
    #[arg(long)]
    pub root: PathBuf,

    /// Output directory; videos are named <folder>.<container>
    #[arg(long)]
    pub out: PathBuf,

    /// Frames per second [default: 24]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub fps: Option<u32>,

    /// Output width in pixels, 0 keeps the source width [default: 1280]
    #[arg(long)]
    pub width: Option<u32>,

    /// File extensions to include, case-insensitive [default: jpg jpeg png]
    #[arg(long = "ext", num_args = 1..)]
    pub extensions: Vec<String>,

    /// Do not burn the timestamp into the bottom-left corner
    #[arg(long)]
    pub no_time: bool,

    /// Source label drawn above the timestamp (empty = none)
    #[arg(long, default_value = "")]
    pub label: String,

    /// FourCC codec, e.g. mp4v, avc1, MJPG [default: mp4v]
    #[arg(long)]
    pub codec: Option<String>,

    /// Output container extension [default: mp4]
    #[arg(long)]
    pub container: Option<String>,

    /// Replace existing output videos
    #[arg(long)]
    pub overwrite: bool,

    /// Keep frames taken at or after this time of day (HH:MM[:SS])
    #[arg(long, value_parser = parse_time_of_day)]
    pub start: Option<NaiveTime>,

    /// Keep frames taken at or before this time of day (HH:MM[:SS]);
    /// earlier than --start wraps past midnight
    #[arg(long, value_parser = parse_time_of_day)]
    pub end: Option<NaiveTime>,

    /// Weekdays to keep, e.g. "mon-fri", "1,3,5", "fri-mon", "週一~週五"
    #[arg(long)]
    pub weekdays: Option<String>,

    /// TrueType/OpenType font for overlays (bundled DejaVu Sans otherwise)
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Write per-folder outcomes as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl RenderArgs {
    /// Merge flags over user defaults.
    pub fn into_config(self, defaults: &Defaults) -> JobConfig {
        let render = &defaults.render;

        let weekdays = self.weekdays.as_deref().and_then(|spec| {
            let parsed = parse_weekdays(spec);
            for token in &parsed.rejected {
                tracing::warn!(token = %token, "Ignoring unrecognized weekday");
            }
            if parsed.days.is_none() {
                tracing::warn!(spec = %spec, "No weekdays recognized, not filtering by weekday");
            }
            parsed.days
        });

        let extensions = if self.extensions.is_empty() {
            normalize_extensions(&render.extensions)
        } else {
            normalize_extensions(&self.extensions)
        };

        let mut config = JobConfig::new(self.root, self.out);
        config.fps = self.fps.unwrap_or(render.fps);
        config.target_width = self.width.unwrap_or(render.width);
        config.extensions = extensions;
        config.overlay_timestamp = !self.no_time;
        config.label = Some(self.label).filter(|l| !l.trim().is_empty());
        config.codec = self.codec.unwrap_or_else(|| render.codec.clone());
        config.container = self.container.unwrap_or_else(|| render.container.clone());
        config.overwrite = self.overwrite;
        config.filter = FrameFilter::new(TimeWindow::new(self.start, self.end), weekdays);
        config.font = self.font;
        config
    }
}

pub fn run(args: RenderArgs, defaults: &Defaults) -> anyhow::Result<()> {
    let report_path = args.report.clone();
    let config = args.into_config(defaults);

    tracing::info!(
        root = %config.source_root.display(),
        out = %config.output_root.display(),
        fps = config.fps,
        width = config.target_width,
        codec = %config.codec,
        filter = ?config.filter,
        "Starting render"
    );

    let sinks = FfmpegSinkFactory::default();
    let show_progress = std::io::stderr().is_terminal();
    let progress: Option<ProgressCallback> = show_progress.then(|| {
        Box::new(|p: JobProgress| match p.stage {
            JobStage::Running => eprint!(
                "\r  {}: {}/{} frames ({:.0}%)   ",
                p.job,
                p.frames_done,
                p.frames_total,
                p.fraction() * 100.0
            ),
            JobStage::Finalizing => eprint!("\r  {}: finalizing...{}", p.job, " ".repeat(16)),
            _ => {}
        }) as ProgressCallback
    });

    let summary = run_jobs(&config, &sinks, progress, |report| {
        if show_progress {
            eprint!("\r\x1b[2K");
        }
        println!("{}", report.line());
    })?;

    println!("{}", summary.line());

    if let Some(path) = report_path {
        let json = summary.to_json()?;
        std::fs::write(&path, json)
            .with_context(|| format!("writing report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Run report written");
    }

    Ok(())
}
