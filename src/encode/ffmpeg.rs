use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Destination for finished RGBA frames.
pub trait FrameSink {
    fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()>;
}

/// Encoder knobs passed straight through to ffmpeg.
#[derive(Clone, Debug)]
pub struct EncodeSettings<'a> {
    pub codec: &'a str,
    pub pix_fmt: &'a str,
    pub crf: u32,
    /// Gain applied to the muxed audio track.
    pub audio_volume: Option<f32>,
}

pub struct FfmpegEncoder {
    child: Child,
    frames: u64,
}

fn path_arg(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .with_context(|| format!("Path is not valid UTF-8: {}", path.display()))
}

impl FfmpegEncoder {
    /// Spawn ffmpeg reading raw frames from stdin. When `input_audio` is
    /// given it is muxed in and the output stops at the shorter stream.
    pub fn new(
        output_path: &Path,
        input_audio: Option<&Path>,
        width: u32,
        height: u32,
        fps: u32,
        settings: &EncodeSettings<'_>,
    ) -> Result<Self> {
        let mut args = vec![
            "-y".to_string(),
            "-f".into(), "rawvideo".into(),
            "-pixel_format".into(), "rgba".into(),
            "-video_size".into(), format!("{}x{}", width, height),
            "-framerate".into(), fps.to_string(),
            "-i".into(), "pipe:0".into(),
        ];

        if let Some(audio) = input_audio {
            args.extend(["-i".to_string(), path_arg(audio)?]);
        }

        args.extend([
            "-c:v".to_string(), settings.codec.to_string(),
            "-pix_fmt".into(), settings.pix_fmt.to_string(),
            "-crf".into(), settings.crf.to_string(),
            "-preset".into(), "medium".into(),
        ]);

        if input_audio.is_some() {
            if let Some(volume) = settings.audio_volume {
                args.extend(["-af".to_string(), format!("volume={:.3}", volume)]);
            }
            args.extend([
                "-c:a".to_string(), "aac".into(),
                "-b:a".into(), "192k".into(),
                "-shortest".into(),
            ]);
        }
        args.push(path_arg(output_path)?);

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={}",
            width, height, fps, settings.codec
        );

        Ok(Self { child, frames: 0 })
    }

    pub fn finish(mut self) -> Result<()> {
        // Close stdin to signal EOF
        drop(self.child.stdin.take());

        let output = self.child.wait_with_output().context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("FFmpeg exited with error:\n{}", stderr);
        }

        log::info!("FFmpeg encoding complete ({} frames)", self.frames);
        Ok(())
    }
}

impl FrameSink for FfmpegEncoder {
    fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        let stdin = self.child.stdin.as_mut().context("FFmpeg stdin not available")?;
        stdin.write_all(rgba_pixels).context("Failed to write frame to ffmpeg")?;
        self.frames += 1;
        Ok(())
    }
}

/// Keeps every frame in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<Vec<u8>>,
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        self.frames.push(rgba_pixels.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_collects_frames() {
        let mut sink = MemorySink::default();
        sink.write_frame(&[1, 2, 3, 4]).unwrap();
        sink.write_frame(&[5, 6, 7, 8]).unwrap();
        assert_eq!(sink.frames, vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]]);
    }
}
