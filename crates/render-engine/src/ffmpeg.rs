//! ffmpeg-backed frame sink.
//!
//! Frames are streamed to `ffmpeg` as raw `rgb24` over stdin and encoded
//! with the encoder mapped from the requested FourCC code:
//!
//! ```text
//! ffmpeg -y -f rawvideo -pix_fmt rgb24 -s WxH -r FPS -i - -c:v <enc> -pix_fmt yuv420p out
//! ```

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::io::{BufWriter, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::OnceLock;
use std::thread::JoinHandle;

use image::RgbImage;

use crate::sink::{check_geometry, FrameSink, SinkError, SinkFactory, SinkSpec};

/// ffmpeg encoder for a FourCC code, case-insensitive.
pub fn encoder_for_fourcc(codec: &str) -> Option<&'static str> {
    let encoder = match codec.trim().to_ascii_lowercase().as_str() {
        "mp4v" | "fmp4" => "mpeg4",
        "xvid" | "divx" => "libxvid",
        "avc1" | "h264" | "x264" => "libx264",
        "hev1" | "hvc1" | "hevc" | "x265" => "libx265",
        "mjpg" => "mjpeg",
        "vp80" => "libvpx",
        "vp90" | "vp09" => "libvpx-vp9",
        "av01" => "libaom-av1",
        "ffv1" => "ffv1",
        _ => return None,
    };
    Some(encoder)
}

/// Opens [`FfmpegSink`]s, probing the local ffmpeg build once.
#[derive(Debug)]
pub struct FfmpegSinkFactory {
    binary: String,
    encoders: OnceLock<Result<BTreeSet<String>, String>>,
}

impl Default for FfmpegSinkFactory {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegSinkFactory {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            encoders: OnceLock::new(),
        }
    }

    /// Whether the ffmpeg binary is on `PATH`.
    pub fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    /// Resolve `codec` to an encoder this ffmpeg build provides.
    ///
    /// Known FourCC codes are mapped; anything else is taken as an ffmpeg
    /// encoder name.
    pub fn resolve_encoder(&self, codec: &str) -> Result<String, SinkError> {
        let unavailable = |reason: String| SinkError::EncoderUnavailable {
            codec: codec.to_string(),
            reason,
        };

        let encoder = encoder_for_fourcc(codec)
            .map(str::to_string)
            .unwrap_or_else(|| codec.trim().to_string());

        let encoders = self
            .encoders()
            .as_ref()
            .map_err(|e| unavailable(e.clone()))?;
        if encoders.contains(&encoder) {
            Ok(encoder)
        } else {
            Err(unavailable(format!("{} has no '{encoder}' encoder", self.binary)))
        }
    }

    fn encoders(&self) -> &Result<BTreeSet<String>, String> {
        self.encoders.get_or_init(|| query_encoders(&self.binary))
    }

    fn command_args(&self, spec: &SinkSpec, encoder: &str) -> Vec<OsString> {
        let size = format!("{}x{}", spec.width, spec.height);
        let fps = spec.fps.to_string();
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            size.as_str(),
            "-r",
            fps.as_str(),
            "-i",
            "-",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();

        // 4:2:0 chroma needs even dimensions; pad odd source sizes by one pixel.
        if spec.width % 2 == 1 || spec.height % 2 == 1 {
            args.push("-vf".into());
            args.push("pad=ceil(iw/2)*2:ceil(ih/2)*2".into());
        }

        args.extend(["-c:v", encoder, "-pix_fmt", "yuv420p"].map(OsString::from));
        // Passed through untouched so non-UTF-8 folder names survive.
        args.push(spec.output.as_os_str().to_owned());
        args
    }
}

impl SinkFactory for FfmpegSinkFactory {
    fn open(&self, spec: &SinkSpec) -> Result<Box<dyn FrameSink>, SinkError> {
        if spec.width == 0 || spec.height == 0 || spec.fps == 0 {
            return Err(SinkError::EncoderUnavailable {
                codec: spec.codec.clone(),
                reason: format!("invalid geometry {}x{} @ {}fps", spec.width, spec.height, spec.fps),
            });
        }
        if !self.is_available() {
            return Err(SinkError::EncoderUnavailable {
                codec: spec.codec.clone(),
                reason: format!("'{}' not found on PATH", self.binary),
            });
        }

        let encoder = self.resolve_encoder(&spec.codec)?;
        let args = self.command_args(spec, &encoder);
        tracing::debug!(args = ?args, "Running ffmpeg");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(SinkError::Spawn)?;

        tracing::info!(
            pid = child.id(),
            encoder = %encoder,
            width = spec.width,
            height = spec.height,
            fps = spec.fps,
            output = %spec.output.display(),
            "ffmpeg process started"
        );

        let stdin = child.stdin.take().map(BufWriter::new);

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || -> String {
                let mut output = String::new();
                match stderr.read_to_string(&mut output) {
                    Ok(_) => output,
                    Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
                }
            })
        });

        Ok(Box::new(FfmpegSink {
            spec: spec.clone(),
            child: Some(child),
            stdin,
            stderr_task,
            frames: 0,
        }))
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// A running ffmpeg process fed raw frames on stdin.
///
/// Dropped without [`finish`](FrameSink::finish), the process is killed.
pub struct FfmpegSink {
    spec: SinkSpec,
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    stderr_task: Option<JoinHandle<String>>,
    frames: u64,
}

impl FfmpegSink {
    fn stderr_output(&mut self) -> String {
        self.stderr_task
            .take()
            .map(|task| {
                task.join()
                    .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
            })
            .unwrap_or_default()
    }
}

impl FrameSink for FfmpegSink {
    fn push(&mut self, frame: &RgbImage) -> Result<(), SinkError> {
        check_geometry(&self.spec, frame)?;
        let index = self.frames;
        let stdin = self.stdin.as_mut().ok_or_else(|| SinkError::Write {
            frame: index,
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "ffmpeg stdin closed"),
        })?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|source| SinkError::Write {
                frame: index,
                source,
            })?;
        self.frames += 1;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<u64, SinkError> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin
                .flush()
                .map_err(|e| SinkError::Finalize(format!("flushing frames: {e}")))?;
        }

        let Some(mut child) = self.child.take() else {
            return Err(SinkError::Finalize("ffmpeg already finished".to_string()));
        };
        let status = child
            .wait()
            .map_err(|e| SinkError::Finalize(format!("waiting on ffmpeg: {e}")))?;
        let stderr_output = self.stderr_output();

        if !status.success() {
            return Err(SinkError::Finalize(format!(
                "ffmpeg exited with {status}: {}",
                stderr_output.trim()
            )));
        }

        tracing::debug!(
            frames = self.frames,
            output = %self.spec.output.display(),
            "ffmpeg finished"
        );
        Ok(self.frames)
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                tracing::debug!(error = %e, "ffmpeg already exited");
            }
            let _ = child.wait();
            tracing::warn!(
                output = %self.spec.output.display(),
                frames = self.frames,
                "Abandoned unfinished ffmpeg encode"
            );
        }
        let _ = self.stderr_output();
    }
}

/// Encoder names listed by `ffmpeg -encoders`.
fn query_encoders(binary: &str) -> Result<BTreeSet<String>, String> {
    let output = Command::new(binary)
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .output()
        .map_err(|e| format!("cannot run {binary}: {e}"))?;

    if !output.status.success() {
        return Err(format!("{binary} -encoders failed with {}", output.status));
    }

    let listing = String::from_utf8_lossy(&output.stdout);
    let encoders = parse_encoder_list(&listing);
    tracing::debug!(count = encoders.len(), "Probed ffmpeg encoders");
    Ok(encoders)
}

/// Parse the table printed by `ffmpeg -encoders`.
///
/// Rows follow a `------` separator as `<flags> <name> <description>`.
fn parse_encoder_list(listing: &str) -> BTreeSet<String> {
    listing
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("---"))
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let flags = fields.next()?;
            let name = fields.next()?;
            (flags.len() == 6).then(|| name.to_string())
        })
        .collect()
}

fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const ENCODER_LISTING: &str = "\
Encoders:
 V..... = Video
 A..... = Audio
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10 (codec h264)
 V.S... mpeg4                MPEG-4 part 2
 VFS..D ffv1                 FFmpeg video codec #1
 A....D aac                  AAC (Advanced Audio Coding)
";

    fn spec(width: u32, height: u32) -> SinkSpec {
        SinkSpec {
            output: PathBuf::from("/tmp/out/2023-07-26.mp4"),
            width,
            height,
            fps: 24,
            codec: "mp4v".to_string(),
        }
    }

    #[test]
    fn test_fourcc_mapping() {
        assert_eq!(encoder_for_fourcc("mp4v"), Some("mpeg4"));
        assert_eq!(encoder_for_fourcc("MP4V"), Some("mpeg4"));
        assert_eq!(encoder_for_fourcc("avc1"), Some("libx264"));
        assert_eq!(encoder_for_fourcc("H264"), Some("libx264"));
        assert_eq!(encoder_for_fourcc("MJPG"), Some("mjpeg"));
        assert_eq!(encoder_for_fourcc("vp09"), Some("libvpx-vp9"));
        assert_eq!(encoder_for_fourcc("zzzz"), None);
    }

    #[test]
    fn test_parse_encoder_list() {
        let encoders = parse_encoder_list(ENCODER_LISTING);
        assert!(encoders.contains("libx264"));
        assert!(encoders.contains("mpeg4"));
        assert!(encoders.contains("ffv1"));
        assert!(encoders.contains("aac"));
        // Legend rows above the separator are not encoders.
        assert!(!encoders.contains("="));
        assert_eq!(encoders.len(), 4);
    }

    #[test]
    fn test_command_line_for_even_canvas() {
        let factory = FfmpegSinkFactory::default();
        let args = factory.command_args(&spec(1280, 720), "mpeg4");
        let joined = args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        assert!(joined.contains("-f rawvideo -pix_fmt rgb24 -s 1280x720 -r 24 -i -"));
        assert!(joined.ends_with("-c:v mpeg4 -pix_fmt yuv420p /tmp/out/2023-07-26.mp4"));
        assert!(!args.contains(&OsString::from("-vf")));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_output_path_is_passed_verbatim() {
        use std::os::unix::ffi::OsStrExt;

        let name = std::ffi::OsStr::from_bytes(b"/tmp/out/caf\xe9.mp4");
        let mut spec = spec(64, 48);
        spec.output = PathBuf::from(name);

        let factory = FfmpegSinkFactory::default();
        let args = factory.command_args(&spec, "mpeg4");
        assert_eq!(args.last().map(|a| a.as_os_str()), Some(name));
    }

    #[test]
    fn test_odd_canvas_is_padded_for_yuv420() {
        let factory = FfmpegSinkFactory::default();
        let args = factory.command_args(&spec(641, 479), "libx264");
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf + 1], "pad=ceil(iw/2)*2:ceil(ih/2)*2");
    }

    #[test]
    fn test_missing_binary_is_encoder_unavailable() {
        let factory = FfmpegSinkFactory::new("folderlapse-no-such-ffmpeg");
        assert!(!factory.is_available());

        let err = factory.open(&spec(64, 48)).err().unwrap();
        assert!(matches!(err, SinkError::EncoderUnavailable { .. }));
        assert!(err.is_open_failure());
    }

    #[test]
    fn test_zero_geometry_is_rejected() {
        let factory = FfmpegSinkFactory::default();
        let err = factory.open(&spec(0, 48)).err().unwrap();
        assert!(matches!(err, SinkError::EncoderUnavailable { .. }));
    }
}
