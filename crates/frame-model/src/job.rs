//! Job configuration, video jobs, and their outcomes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use folderlapse_common::error::{LapseError, LapseResult};

use crate::filter::FrameFilter;

/// Immutable configuration shared by every job in a run.
///
/// Built once from the command line (and user defaults) and passed
/// explicitly into the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct JobConfig {
    /// Root directory holding date folders (or images directly).
    pub source_root: PathBuf,

    /// Directory receiving one video per job.
    pub output_root: PathBuf,

    /// Output frame rate.
    pub fps: u32,

    /// Output width in pixels (0 = use the first frame's width).
    pub target_width: u32,

    /// Allowed image extensions, lowercase without the dot.
    pub extensions: Vec<String>,

    /// Burn the frame timestamp into the bottom-left corner.
    pub overlay_timestamp: bool,

    /// Optional free-text source label drawn above the timestamp.
    pub label: Option<String>,

    /// FourCC codec identifier understood by the frame sink.
    pub codec: String,

    /// Output container extension (e.g. `mp4`).
    pub container: String,

    /// Replace outputs that already exist.
    pub overwrite: bool,

    /// Time-of-day and weekday selection.
    pub filter: FrameFilter,

    /// Font used for overlays (bundled font when `None`).
    pub font: Option<PathBuf>,
}

impl JobConfig {
    /// Configuration with the stock defaults for everything but the paths.
    pub fn new(source_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            output_root: output_root.into(),
            fps: 24,
            target_width: 1280,
            extensions: normalize_extensions(["jpg", "jpeg", "png"]),
            overlay_timestamp: true,
            label: None,
            codec: "mp4v".to_string(),
            container: "mp4".to_string(),
            overwrite: false,
            filter: FrameFilter::NONE,
            font: None,
        }
    }

    /// Check values the type system cannot.
    pub fn validate(&self) -> LapseResult<()> {
        if self.fps == 0 {
            return Err(LapseError::config("fps must be a positive integer"));
        }
        if self.extensions.is_empty() {
            return Err(LapseError::config("at least one file extension is required"));
        }
        if self.codec.trim().is_empty() {
            return Err(LapseError::config("codec must not be empty"));
        }
        if self.container.trim().is_empty() || self.container.contains(['/', '\\']) {
            return Err(LapseError::config(format!(
                "invalid container extension '{}'",
                self.container
            )));
        }
        Ok(())
    }

    /// Case-insensitive extension check (`ext` may carry a leading dot).
    pub fn allows_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.').to_lowercase();
        self.extensions.iter().any(|allowed| *allowed == ext)
    }

    /// Output path for a job named after its source folder.
    pub fn output_path_for(&self, job_name: &str) -> PathBuf {
        self.output_root
            .join(format!("{job_name}.{}", self.container.trim_start_matches('.')))
    }

    /// Label text, ignoring empty strings.
    pub fn label_text(&self) -> Option<&str> {
        self.label.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Lowercase, strip leading dots, drop empties and duplicates.
pub fn normalize_extensions<I, S>(extensions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for ext in extensions {
        let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
        if !ext.is_empty() && !out.contains(&ext) {
            out.push(ext);
        }
    }
    out
}

/// One source folder bound to one output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoJob {
    /// Job name (the source folder name).
    pub name: String,

    /// Folder holding the frames.
    pub source_dir: PathBuf,

    /// Video file this job writes.
    pub output_path: PathBuf,
}

impl VideoJob {
    /// Create a job for a folder, naming the output after the folder.
    pub fn for_folder(source_dir: impl Into<PathBuf>, config: &JobConfig) -> Self {
        let source_dir = source_dir.into();
        let name = folder_name(&source_dir);
        let output_path = config.output_path_for(&name);
        Self {
            name,
            source_dir,
            output_path,
        }
    }
}

/// Display name of a folder, resolving `.` and `..` through the filesystem.
pub fn folder_name(dir: &Path) -> String {
    if let Some(name) = dir.file_name() {
        return name.to_string_lossy().into_owned();
    }
    std::fs::canonicalize(dir)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "timelapse".to_string())
}

/// Stages a running job moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Discovered,
    Selecting,
    Running,
    Finalizing,
}

/// Why a job produced no video without failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// No file survived extension and time/weekday filtering.
    EmptySelection,
    /// Frames were selected but none could be decoded.
    NoDecodableFrames { attempted: u64 },
    /// Output already present and overwrite not requested.
    OutputExists { output: PathBuf },
}

/// Why a job failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailReason {
    /// The source folder could not be listed.
    FolderUnreadable { detail: String },
    /// The directory for the output video could not be created.
    OutputUnwritable { detail: String },
    /// No encoder could be started for this codec.
    NoEncoder { codec: String, detail: String },
    /// The frame sink failed while opening, writing or finalizing.
    SinkFailed { detail: String },
}

/// Terminal state of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Done {
        output: PathBuf,
        frames: u64,
        fps: u32,
        dropped_frames: u64,
        width: u32,
        height: u32,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        reason: FailReason,
    },
}

impl JobOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, JobOutcome::Done { .. })
    }

    /// Fixed-width console tag.
    pub fn tag(&self) -> &'static str {
        match self {
            JobOutcome::Done { .. } => "[OK  ]",
            JobOutcome::Skipped { .. } => "[SKIP]",
            JobOutcome::Failed { .. } => "[ERR ]",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::EmptySelection => write!(f, "no matching images"),
            SkipReason::NoDecodableFrames { attempted } => {
                write!(f, "none of {attempted} selected images could be decoded")
            }
            SkipReason::OutputExists { output } => write!(
                f,
                "{} already exists (use --overwrite to replace)",
                output.display()
            ),
        }
    }
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailReason::FolderUnreadable { detail } => write!(f, "cannot list folder: {detail}"),
            FailReason::OutputUnwritable { detail } => {
                write!(f, "cannot create output directory: {detail}")
            }
            FailReason::NoEncoder { codec, detail } => {
                write!(f, "cannot open video writer, encoder unavailable (codec={codec}): {detail}")
            }
            FailReason::SinkFailed { detail } => write!(f, "video writer failed: {detail}"),
        }
    }
}

/// Outcome of one job, as reported to the console and the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub job: VideoJob,
    pub outcome: JobOutcome,
}

impl JobReport {
    /// One console line for this job.
    pub fn line(&self) -> String {
        match &self.outcome {
            JobOutcome::Done {
                output,
                frames,
                fps,
                ..
            } => format!(
                "{} {}  ({frames} frames @ {fps}fps)",
                self.outcome.tag(),
                output.display()
            ),
            JobOutcome::Skipped { reason } => {
                format!("{} {}: {reason}", self.outcome.tag(), self.job.name)
            }
            JobOutcome::Failed { reason } => {
                format!("{} {}: {reason}", self.outcome.tag(), self.job.name)
            }
        }
    }
}

/// Aggregate of every job in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub reports: Vec<JobReport>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.reports.len()
    }

    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_ok()).count()
    }

    pub fn skipped(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, JobOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, JobOutcome::Failed { .. }))
            .count()
    }

    /// Final console line.
    pub fn line(&self) -> String {
        format!("Done: {} / {} succeeded", self.succeeded(), self.total())
    }

    /// Pretty JSON for the run report file.
    pub fn to_json(&self) -> LapseResult<String> {
        let value = serde_json::json!({
            "total": self.total(),
            "succeeded": self.succeeded(),
            "skipped": self.skipped(),
            "failed": self.failed(),
            "jobs": self.reports,
        });
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_extensions() {
        assert_eq!(
            normalize_extensions([".JPG", "jpeg", "jpg", " png ", ""]),
            vec!["jpg", "jpeg", "png"]
        );
    }

    #[test]
    fn test_allows_extension_is_case_insensitive() {
        let config = JobConfig::new("/in", "/out");
        assert!(config.allows_extension("JPG"));
        assert!(config.allows_extension(".png"));
        assert!(!config.allows_extension("gif"));
    }

    #[test]
    fn test_job_output_mirrors_folder_name() {
        let config = JobConfig::new("/in", "/out");
        let job = VideoJob::for_folder("/in/2023-07-26", &config);
        assert_eq!(job.name, "2023-07-26");
        assert_eq!(job.output_path, PathBuf::from("/out/2023-07-26.mp4"));
    }

    #[test]
    fn test_validate_rejects_zero_fps() {
        let mut config = JobConfig::new("/in", "/out");
        assert!(config.validate().is_ok());
        config.fps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_label_is_ignored() {
        let mut config = JobConfig::new("/in", "/out");
        config.label = Some("   ".to_string());
        assert_eq!(config.label_text(), None);
        config.label = Some("Cam 1".to_string());
        assert_eq!(config.label_text(), Some("Cam 1"));
    }

    #[test]
    fn test_summary_counts_and_lines() {
        let config = JobConfig::new("/in", "/out");
        let ok = JobReport {
            job: VideoJob::for_folder("/in/2023-07-26", &config),
            outcome: JobOutcome::Done {
                output: PathBuf::from("/out/2023-07-26.mp4"),
                frames: 4,
                fps: 24,
                dropped_frames: 1,
                width: 1280,
                height: 720,
            },
        };
        let skip = JobReport {
            job: VideoJob::for_folder("/in/2023-07-27", &config),
            outcome: JobOutcome::Skipped {
                reason: SkipReason::EmptySelection,
            },
        };
        let summary = RunSummary {
            reports: vec![ok.clone(), skip.clone()],
        };

        assert_eq!(summary.total(), 2);
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.failed(), 0);
        assert_eq!(summary.line(), "Done: 1 / 2 succeeded");
        assert_eq!(ok.line(), "[OK  ] /out/2023-07-26.mp4  (4 frames @ 24fps)");
        assert!(skip.line().starts_with("[SKIP] 2023-07-27"));

        let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert_eq!(json["succeeded"], 1);
        assert_eq!(json["jobs"][0]["outcome"]["status"], "done");
        assert_eq!(json["jobs"][1]["outcome"]["reason"]["kind"], "empty_selection");
    }

    #[test]
    fn test_unwritable_output_is_a_distinct_failure() {
        let config = JobConfig::new("/in", "/out");
        let report = JobReport {
            job: VideoJob::for_folder("/in/2023-07-26", &config),
            outcome: JobOutcome::Failed {
                reason: FailReason::OutputUnwritable {
                    detail: "/out: Permission denied".to_string(),
                },
            },
        };

        assert!(!report.outcome.is_ok());
        assert_eq!(
            report.line(),
            "[ERR ] 2023-07-26: cannot create output directory: /out: Permission denied"
        );
        let json = serde_json::to_value(&report.outcome).unwrap();
        assert_eq!(json["reason"]["kind"], "output_unwritable");
    }
}
