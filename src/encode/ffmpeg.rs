use std::cell::OnceCell;
use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::assets::audio::AudioAsset;
use crate::encode::encoder::{Artifact, AudioSource, Encoder, EncoderConfig, EncodingProfile};
use crate::foundation::error::{CineforgeError, CineforgeResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::surface::FrameRGBA;

const STDOUT_CHUNK: usize = 64 * 1024;

/// Tool locations for [`FfmpegEncoder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FfmpegEncoderOpts {
    /// `ffmpeg` executable. Default: `$CINEFORGE_FFMPEG` or `ffmpeg` on `PATH`.
    pub ffmpeg_bin: PathBuf,
    /// `ffprobe` executable. Default: `$CINEFORGE_FFPROBE` or `ffprobe` on `PATH`.
    pub ffprobe_bin: PathBuf,
}

impl Default for FfmpegEncoderOpts {
    fn default() -> Self {
        let from_env = |key: &str, fallback: &str| {
            std::env::var_os(key)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(fallback))
        };
        Self {
            ffmpeg_bin: from_env("CINEFORGE_FFMPEG", "ffmpeg"),
            ffprobe_bin: from_env("CINEFORGE_FFPROBE", "ffprobe"),
        }
    }
}

impl FfmpegEncoderOpts {
    pub fn with_ffmpeg_bin(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_bin = path.into();
        self
    }

    pub fn with_ffprobe_bin(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffprobe_bin = path.into();
        self
    }
}

/// Encoder that spawns the system `ffmpeg`, streams raw frames to its stdin and collects the
/// muxed container from its stdout.
///
/// Frames are placed on the constant-rate output grid by timestamp, the way a real-time recorder
/// samples a canvas: a late frame repeats the previous one into the skipped slots, and a frame
/// landing in an already written slot is dropped.
pub struct FfmpegEncoder {
    opts: FfmpegEncoderOpts,
    encoders: OnceCell<Vec<String>>,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout_drain: Option<JoinHandle<std::io::Result<Vec<Vec<u8>>>>>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    cfg: Option<EncoderConfig>,
    last_slot: Option<u64>,
    slots_written: u64,
    input_closed: bool,
}

impl FfmpegEncoder {
    pub fn new(opts: FfmpegEncoderOpts) -> Self {
        Self {
            opts,
            encoders: OnceCell::new(),
            child: None,
            stdin: None,
            stdout_drain: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_slot: None,
            slots_written: 0,
            input_closed: false,
        }
    }

    /// `true` when the configured `ffmpeg` runs.
    pub fn is_available(&self) -> bool {
        tool_runs(&self.opts.ffmpeg_bin)
    }

    fn encoder_names(&self) -> &[String] {
        self.encoders.get_or_init(|| {
            match Command::new(&self.opts.ffmpeg_bin)
                .args(["-hide_banner", "-encoders"])
                .stdin(Stdio::null())
                .stderr(Stdio::null())
                .output()
            {
                Ok(out) if out.status.success() => {
                    parse_encoder_list(&String::from_utf8_lossy(&out.stdout))
                }
                Ok(out) => {
                    tracing::warn!(status = %out.status, "ffmpeg -encoders failed");
                    Vec::new()
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to run ffmpeg -encoders");
                    Vec::new()
                }
            }
        })
    }

    fn write_slot(&mut self) -> CineforgeResult<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            if self.input_closed {
                return Ok(());
            }
            return Err(CineforgeError::encode("ffmpeg encoder is already finalized"));
        };
        match stdin.write_all(&self.scratch) {
            Ok(()) => {
                self.slots_written += 1;
                Ok(())
            }
            // `-shortest` ends the stream when a shorter audio track runs out. A crash surfaces
            // as a failed exit status in `stop`.
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                tracing::debug!(slots = self.slots_written, "ffmpeg closed its input early");
                self.stdin = None;
                self.input_closed = true;
                Ok(())
            }
            Err(e) => Err(CineforgeError::encode(format!(
                "failed to write frame to ffmpeg stdin: {e}"
            ))),
        }
    }

    fn reset(&mut self) {
        self.cfg = None;
        self.last_slot = None;
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Encoder for FfmpegEncoder {
    fn is_supported(&self, profile: &EncodingProfile) -> bool {
        let names = self.encoder_names();
        let has = |n: &str| names.iter().any(|e| e == n);
        has(profile.video_encoder) && has(profile.audio_encoder)
    }

    #[tracing::instrument(skip_all, fields(mime = %audio.mime(), bytes = audio.bytes().len()))]
    fn open_audio(&mut self, audio: &AudioAsset) -> CineforgeResult<AudioSource> {
        let path = temp_path("audio", audio.extension());
        std::fs::write(&path, audio.bytes()).map_err(|e| {
            CineforgeError::encode(format!(
                "failed to write audio temp file '{}': {e}",
                path.display()
            ))
        })?;
        let source = AudioSource::temp_file(audio.mime(), path.clone());
        if !probe_has_audio_stream(&self.opts.ffprobe_bin, &path)? {
            return Err(CineforgeError::decode("audio source has no audio stream"));
        }
        Ok(source)
    }

    fn start(&mut self, cfg: EncoderConfig) -> CineforgeResult<()> {
        if self.child.is_some() {
            return Err(CineforgeError::encode("ffmpeg encoder already started"));
        }
        if cfg.fps == 0 {
            return Err(CineforgeError::validation("fps must be non-zero"));
        }
        let (w, h) = (cfg.size.width, cfg.size.height);
        if w == 0 || h == 0 {
            return Err(CineforgeError::validation(
                "ffmpeg encoder width/height must be non-zero",
            ));
        }
        if !w.is_multiple_of(2) || !h.is_multiple_of(2) {
            return Err(CineforgeError::validation(
                "ffmpeg encoder width/height must be even (required for yuv420p output)",
            ));
        }

        let mut cmd = Command::new(&self.opts.ffmpeg_bin);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{w}x{h}"),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
        ]);

        let audio_path = cfg.audio.as_ref().and_then(|a| a.path());
        if let Some(path) = audio_path {
            cmd.arg("-i").arg(path);
            cmd.args(["-map", "0:v:0", "-map", "1:a:0"]);
        }

        cmd.args([
            "-c:v",
            cfg.profile.video_encoder,
            "-b:v",
            &cfg.video_bitrate.to_string(),
            "-pix_fmt",
            "yuv420p",
        ]);
        if cfg.profile.video_encoder.starts_with("libvpx") {
            cmd.args(["-deadline", "realtime", "-cpu-used", "8"]);
        }

        if audio_path.is_some() {
            cmd.args(["-c:a", cfg.profile.audio_encoder, "-shortest"]);
        } else {
            cmd.arg("-an");
        }

        if cfg.profile.muxer == "mp4" {
            // Non-seekable output needs a fragmented MP4.
            cmd.args(["-movflags", "frag_keyframe+empty_moov"]);
        }
        cmd.args(["-f", cfg.profile.muxer, "pipe:1"]);

        let mut child = cmd.spawn().map_err(|e| {
            CineforgeError::encode(format!(
                "failed to spawn '{}' (is it installed and on PATH?): {e}",
                self.opts.ffmpeg_bin.display()
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CineforgeError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| CineforgeError::encode("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| CineforgeError::encode("failed to open ffmpeg stderr (unexpected)"))?;

        let stdout_drain = std::thread::spawn(move || {
            let mut chunks = Vec::new();
            let mut buf = vec![0u8; STDOUT_CHUNK];
            loop {
                let n = stdout.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                chunks.push(buf[..n].to_vec());
            }
            Ok(chunks)
        });
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.scratch = vec![0u8; cfg.size.rgba8_len()];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stdout_drain = Some(stdout_drain);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_slot = None;
        self.slots_written = 0;
        self.input_closed = false;
        Ok(())
    }

    fn push_frame(&mut self, timestamp_ms: f64, frame: &FrameRGBA) -> CineforgeResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| CineforgeError::encode("ffmpeg encoder not started"))?;
        if frame.width != cfg.size.width || frame.height != cfg.size.height {
            return Err(CineforgeError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.size.width, cfg.size.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(CineforgeError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        let slot = frame_slot(timestamp_ms, cfg.fps);
        let first_new = match self.last_slot {
            Some(last) if slot <= last => {
                tracing::trace!(timestamp_ms, slot, "frame shares an encoded slot; dropped");
                return Ok(());
            }
            Some(last) => last + 1,
            None => 0,
        };

        // Hold the previous frame across skipped slots.
        if self.last_slot.is_some() {
            for _ in first_new..slot {
                self.write_slot()?;
            }
        }

        if frame.premultiplied {
            flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &frame.data, [0, 0, 0, 255])?;
        } else {
            self.scratch.copy_from_slice(&frame.data);
        }

        if self.last_slot.is_none() {
            for _ in 0..slot {
                self.write_slot()?;
            }
        }
        self.write_slot()?;
        self.last_slot = Some(slot);
        Ok(())
    }

    fn stop(&mut self) -> CineforgeResult<Artifact> {
        let profile = self
            .cfg
            .as_ref()
            .map(|c| c.profile)
            .ok_or_else(|| CineforgeError::encode("ffmpeg encoder not started"))?;

        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| CineforgeError::encode("ffmpeg encoder not started"))?;
        let status = child.wait().map_err(|e| {
            CineforgeError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;

        let chunks = match self.stdout_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| CineforgeError::encode("ffmpeg stdout drain thread panicked"))?
                .map_err(|e| CineforgeError::encode(format!("ffmpeg stdout read failed: {e}")))?,
            None => Vec::new(),
        };
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| CineforgeError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| CineforgeError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        self.reset();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(CineforgeError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        let bytes = chunks.concat();
        tracing::debug!(
            slots = self.slots_written,
            chunks = chunks.len(),
            bytes = bytes.len(),
            "ffmpeg finished"
        );
        if bytes.is_empty() {
            return Err(CineforgeError::encode("ffmpeg produced no output"));
        }
        Ok(Artifact {
            mime_type: profile.mime_type.to_owned(),
            extension: profile.extension.to_owned(),
            bytes,
        })
    }
}

/// Index of the output frame slot `timestamp_ms` falls on at `fps`.
pub(crate) fn frame_slot(timestamp_ms: f64, fps: u32) -> u64 {
    (timestamp_ms.max(0.0) * f64::from(fps) / 1000.0).round() as u64
}

/// Encoder names from `ffmpeg -encoders` output.
pub(crate) fn parse_encoder_list(text: &str) -> Vec<String> {
    text.lines()
        .skip_while(|l| !l.trim_start().starts_with("------"))
        .skip(1)
        .filter_map(|l| l.split_whitespace().nth(1))
        .map(str::to_owned)
        .collect()
}

fn probe_has_audio_stream(ffprobe: &Path, path: &Path) -> CineforgeResult<bool> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
    }

    let out = Command::new(ffprobe)
        .args(["-v", "error", "-print_format", "json", "-show_streams"])
        .arg(path)
        .output()
        .map_err(|e| CineforgeError::encode(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(CineforgeError::decode(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| CineforgeError::serde(format!("ffprobe json parse failed: {e}")))?;
    Ok(parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio")))
}

fn temp_path(kind: &str, ext: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    std::env::temp_dir().join(format!(
        "cineforge_{kind}_{}_{nanos}.{ext}",
        std::process::id()
    ))
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> CineforgeResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(CineforgeError::validation(
            "flatten_premul_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg = [
        u16::from(bg_rgba[0]),
        u16::from(bg_rgba[1]),
        u16::from(bg_rgba[2]),
    ];
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255u16 - a;
        for c in 0..3 {
            d[c] = (u16::from(s[c]) + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

fn tool_runs(bin: &Path) -> bool {
    Command::new(bin)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    tool_runs(Path::new("ffmpeg"))
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> CineforgeResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
