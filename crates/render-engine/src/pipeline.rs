//! Folder-to-video pipeline.
//!
//! Each job moves through
//! `Discovered → Selecting → Running → Finalizing` and ends as exactly one
//! [`JobOutcome`]. A job never aborts the run: every failure below the
//! two fatal discovery errors becomes a per-job skip or error, and a
//! frame that cannot be decoded is dropped from its job.

use std::path::Path;

use folderlapse_common::clock::format_overlay_timestamp;
use folderlapse_common::error::{LapseError, LapseResult};
use folderlapse_frame_model::job::{
    FailReason, JobConfig, JobOutcome, JobReport, JobStage, RunSummary, SkipReason, VideoJob,
};
use folderlapse_frame_select::{discover_jobs, select_frames};
use folderlapse_processing_core::{Frame, FrameNormalizer, OverlayRenderer};

use crate::sink::{FrameSink, SinkFactory, SinkSpec};

/// Progress callback for job rendering.
pub type ProgressCallback = Box<dyn Fn(JobProgress) + Send>;

/// Job progress report.
#[derive(Debug, Clone)]
pub struct JobProgress {
    /// Job name.
    pub job: String,

    /// Current stage.
    pub stage: JobStage,

    /// Selected frames handled so far (written or dropped).
    pub frames_done: u64,

    /// Frames selected for this job.
    pub frames_total: u64,
}

impl JobProgress {
    /// Completion in `[0.0, 1.0]`.
    pub fn fraction(&self) -> f64 {
        if self.frames_total == 0 {
            return 0.0;
        }
        (self.frames_done as f64 / self.frames_total as f64).clamp(0.0, 1.0)
    }
}

/// Runs video jobs against one configuration and sink backend.
pub struct JobRunner<'a> {
    config: &'a JobConfig,
    sinks: &'a dyn SinkFactory,
    overlay: Option<OverlayRenderer>,
    progress: Option<ProgressCallback>,
}

impl<'a> JobRunner<'a> {
    /// Validate the configuration and load the overlay font if needed.
    pub fn new(config: &'a JobConfig, sinks: &'a dyn SinkFactory) -> LapseResult<Self> {
        config.validate()?;

        let overlay = if config.overlay_timestamp || config.label_text().is_some() {
            let renderer = OverlayRenderer::load(config.font.as_deref())
                .map_err(|e| LapseError::config(e.to_string()))?;
            tracing::debug!(renderer = ?renderer, "Overlay font loaded");
            Some(renderer)
        } else {
            None
        };
        tracing::debug!(backend = sinks.name(), "Frame sink backend");

        Ok(Self {
            config,
            sinks,
            overlay,
            progress: None,
        })
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run every job in order, handing each report to `on_report` as it
    /// completes.
    pub fn run_all(&self, jobs: &[VideoJob], mut on_report: impl FnMut(&JobReport)) -> RunSummary {
        let mut summary = RunSummary::default();
        for job in jobs {
            let report = self.run_job(job);
            on_report(&report);
            summary.reports.push(report);
        }

        tracing::info!(
            total = summary.total(),
            succeeded = summary.succeeded(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            "Run complete"
        );
        summary
    }

    /// Run one job to its terminal outcome.
    pub fn run_job(&self, job: &VideoJob) -> JobReport {
        let span = tracing::info_span!("job", name = %job.name);
        let _guard = span.enter();

        let outcome = self.execute(job);
        match &outcome {
            JobOutcome::Done {
                frames,
                dropped_frames,
                ..
            } => tracing::info!(frames, dropped_frames, "Job done"),
            JobOutcome::Skipped { reason } => tracing::info!(%reason, "Job skipped"),
            JobOutcome::Failed { reason } => tracing::error!(%reason, "Job failed"),
        }

        JobReport {
            job: job.clone(),
            outcome,
        }
    }

    fn execute(&self, job: &VideoJob) -> JobOutcome {
        self.report(job, JobStage::Discovered, 0, 0);
        self.report(job, JobStage::Selecting, 0, 0);

        let selection =
            match select_frames(&job.source_dir, &self.config.extensions, &self.config.filter) {
                Ok(selection) => selection,
                Err(e) => {
                    return JobOutcome::Failed {
                        reason: FailReason::FolderUnreadable {
                            detail: e.to_string(),
                        },
                    }
                }
            };
        if selection.is_empty() {
            return JobOutcome::Skipped {
                reason: SkipReason::EmptySelection,
            };
        }

        if let Some(parent) = job.output_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return JobOutcome::Failed {
                    reason: FailReason::OutputUnwritable {
                        detail: format!("{}: {e}", parent.display()),
                    },
                };
            }
        }
        if job.output_path.exists() && !self.config.overwrite {
            return JobOutcome::Skipped {
                reason: SkipReason::OutputExists {
                    output: job.output_path.clone(),
                },
            };
        }

        let total = selection.len() as u64;
        let label = self.config.label_text();
        let mut normalizer = FrameNormalizer::new(self.config.target_width);
        let mut sink: Option<Box<dyn FrameSink>> = None;
        let mut dropped = 0u64;

        for (index, candidate) in selection.frames.iter().enumerate() {
            self.report(job, JobStage::Running, index as u64, total);

            let frame = match Frame::load(&candidate.path, candidate.modified) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(file = ?candidate.file_name(), error = %e, "Cannot read frame, skipping");
                    dropped += 1;
                    continue;
                }
            };

            let mut canvas = normalizer.normalize(frame.image);

            if sink.is_none() {
                let spec = SinkSpec {
                    output: job.output_path.clone(),
                    width: canvas.width(),
                    height: canvas.height(),
                    fps: self.config.fps,
                    codec: self.config.codec.clone(),
                };
                match self.sinks.open(&spec) {
                    Ok(opened) => sink = Some(opened),
                    Err(e) if e.is_open_failure() => {
                        return JobOutcome::Failed {
                            reason: FailReason::NoEncoder {
                                codec: self.config.codec.clone(),
                                detail: e.to_string(),
                            },
                        }
                    }
                    Err(e) => {
                        discard_partial(&job.output_path);
                        return JobOutcome::Failed {
                            reason: FailReason::SinkFailed {
                                detail: e.to_string(),
                            },
                        };
                    }
                }
            }

            if let Some(overlay) = &self.overlay {
                let timestamp = self
                    .config
                    .overlay_timestamp
                    .then(|| format_overlay_timestamp(frame.timestamp));
                overlay.annotate(&mut canvas, timestamp.as_deref(), label);
            }

            let Some(active) = sink.as_mut() else {
                continue;
            };
            if let Err(e) = active.push(&canvas) {
                let written = active.frames_written();
                drop(sink.take());
                discard_partial(&job.output_path);
                return JobOutcome::Failed {
                    reason: FailReason::SinkFailed {
                        detail: format!("{e} (after {written} frames)"),
                    },
                };
            }
        }

        let Some(sink) = sink else {
            return JobOutcome::Skipped {
                reason: SkipReason::NoDecodableFrames { attempted: total },
            };
        };

        self.report(job, JobStage::Finalizing, total, total);
        let canvas = normalizer.canvas();
        match sink.finish() {
            Ok(frames) => JobOutcome::Done {
                output: job.output_path.clone(),
                frames,
                fps: self.config.fps,
                dropped_frames: dropped,
                width: canvas.map_or(0, |c| c.width),
                height: canvas.map_or(0, |c| c.height),
            },
            Err(e) => {
                discard_partial(&job.output_path);
                JobOutcome::Failed {
                    reason: FailReason::SinkFailed {
                        detail: e.to_string(),
                    },
                }
            }
        }
    }

    fn report(&self, job: &VideoJob, stage: JobStage, frames_done: u64, frames_total: u64) {
        if let Some(cb) = &self.progress {
            cb(JobProgress {
                job: job.name.clone(),
                stage,
                frames_done,
                frames_total,
            });
        }
    }
}

/// Remove a half-written output so the next run does not skip it as done.
fn discard_partial(output: &Path) {
    if output.exists() {
        match std::fs::remove_file(output) {
            Ok(()) => tracing::debug!(output = %output.display(), "Removed partial output"),
            Err(e) => {
                tracing::warn!(output = %output.display(), error = %e, "Cannot remove partial output")
            }
        }
    }
}

/// Discover jobs under the configured root and run them all.
///
/// Only the fatal conditions (missing root, nothing to do, bad
/// configuration, uncreatable output root, checked in that order) are
/// errors; everything else is reported in the summary.
pub fn run(
    config: &JobConfig,
    sinks: &dyn SinkFactory,
    progress: Option<ProgressCallback>,
    on_report: impl FnMut(&JobReport),
) -> LapseResult<RunSummary> {
    let jobs = discover_jobs(config)?;

    let mut runner = JobRunner::new(config, sinks)?;
    if let Some(progress) = progress {
        runner = runner.with_progress(progress);
    }
    std::fs::create_dir_all(&config.output_root)?;
    Ok(runner.run_all(&jobs, on_report))
}
