use std::io::{Read, Write as _};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use crate::container::{AvcDecoderConfig, avcc_to_annex_b};
use crate::decode::decoder::{
    DecoderConfig, DecoderOutput, EncodedChunk, PixelFormat, RawFrame, VideoDecoder,
};
use crate::foundation::error::{ScrollyError, ScrollyResult};

/// Decoder backed by the system `ffmpeg`.
///
/// Chunks are rewritten to Annex-B and streamed to stdin; raw RGBA frames are read from stdout on a
/// helper thread and forwarded to the [`DecoderOutput`]. Frames carry no timestamps, ffmpeg emits
/// them in presentation order.
pub struct FfmpegDecoder {
    stdin: Option<ChildStdin>,
    reader: Option<JoinHandle<()>>,
    avc: Option<AvcDecoderConfig>,
    scratch: Vec<u8>,
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegDecoder {
    pub fn new() -> Self {
        Self {
            stdin: None,
            reader: None,
            avc: None,
            scratch: Vec::new(),
        }
    }
}

impl VideoDecoder for FfmpegDecoder {
    fn configure(&mut self, config: &DecoderConfig, output: DecoderOutput) -> ScrollyResult<()> {
        if self.stdin.is_some() {
            return Err(ScrollyError::decoder("ffmpeg decoder already configured"));
        }
        let frame_bytes = frame_len(config.coded_width, config.coded_height)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "h264",
            "-i",
            "pipe:0",
            "-an",
            "-fps_mode",
            "passthrough",
            "-s",
            &format!("{}x{}", config.coded_width, config.coded_height),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "pipe:1",
        ]);

        let mut child = cmd.spawn().map_err(|e| {
            ScrollyError::decoder(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ScrollyError::decoder("failed to open ffmpeg stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ScrollyError::decoder("failed to open ffmpeg stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ScrollyError::decoder("failed to open ffmpeg stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        let (width, height) = (config.coded_width, config.coded_height);
        let reader = std::thread::spawn(move || {
            pump_frames(child, stdout, stderr_drain, width, height, frame_bytes, output);
        });

        tracing::debug!(codec = %config.codec, width, height, "ffmpeg decoder started");
        self.stdin = Some(stdin);
        self.reader = Some(reader);
        self.avc = Some(config.avc.clone());
        Ok(())
    }

    fn decode(&mut self, chunk: EncodedChunk) -> ScrollyResult<()> {
        let avc = self
            .avc
            .as_ref()
            .ok_or_else(|| ScrollyError::decoder("ffmpeg decoder not configured"))?;
        self.scratch.clear();
        avcc_to_annex_b(&chunk.data, avc, chunk.is_keyframe, &mut self.scratch)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ScrollyError::decoder("ffmpeg decoder is already flushed"));
        };
        stdin.write_all(&self.scratch).map_err(|e| {
            ScrollyError::decoder(format!("failed to write chunk to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn flush(&mut self) -> ScrollyResult<()> {
        // EOF on stdin makes ffmpeg drain and exit.
        drop(self.stdin.take());
        Ok(())
    }

    fn close(&mut self) {
        drop(self.stdin.take());
        if let Some(reader) = self.reader.take()
            && reader.join().is_err()
        {
            tracing::warn!("ffmpeg reader thread panicked");
        }
    }
}

/// Largest coded picture accepted, 8192x8192.
const MAX_FRAME_PIXELS: u64 = 8192 * 8192;

/// Bytes in one RGBA frame of the given coded size.
fn frame_len(width: u32, height: u32) -> ScrollyResult<usize> {
    let pixels = u64::from(width) * u64::from(height);
    if pixels == 0 || pixels > MAX_FRAME_PIXELS {
        return Err(ScrollyError::decoder(format!(
            "invalid coded size {width}x{height}"
        )));
    }
    Ok((pixels * 4) as usize)
}

type StderrDrain = JoinHandle<std::io::Result<Vec<u8>>>;

fn pump_frames(
    mut child: Child,
    mut stdout: ChildStdout,
    stderr_drain: StderrDrain,
    width: u32,
    height: u32,
    frame_len: usize,
    output: DecoderOutput,
) {
    let mut listening = true;
    loop {
        let mut buf = vec![0u8; frame_len];
        match read_full(&mut stdout, &mut buf) {
            Ok(n) if n == frame_len => {
                let frame = RawFrame {
                    width,
                    height,
                    format: PixelFormat::Rgba8,
                    timestamp_us: None,
                    data: buf,
                };
                if !output.frame(frame) {
                    listening = false;
                    break;
                }
            }
            Ok(0) => break,
            Ok(n) => {
                output.error(format!(
                    "ffmpeg produced a partial frame ({n} of {frame_len} bytes)"
                ));
                break;
            }
            Err(e) => {
                output.error(format!("failed to read ffmpeg output: {e}"));
                break;
            }
        }
    }
    drop(stdout);

    let status = child.wait();
    let stderr = match stderr_drain.join() {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).trim().to_string(),
        _ => String::new(),
    };
    match status {
        Ok(s) if s.success() => {}
        // Closing stdout early makes ffmpeg fail on a broken pipe; nobody is listening then.
        Ok(_) | Err(_) if !listening => {}
        Ok(s) => {
            output.error(format!("ffmpeg exited with status {s}: {stderr}"));
        }
        Err(e) => {
            output.error(format!("failed to wait for ffmpeg: {e}"));
        }
    }
}

fn read_full(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/decode/ffmpeg.rs"]
mod tests;
