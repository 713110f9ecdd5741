use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream, ReadOnlySource};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

#[derive(Debug)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate.max(1) as f32
    }
}

pub fn decode_audio(path: &Path, max_seconds: Option<f32>) -> Result<AudioData> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    decode_source(Box::new(file), hint, max_seconds)
}

/// Pull up to `max_seconds` of audio from a live HTTP stream.
pub fn decode_stream(url: &str, max_seconds: f32) -> Result<AudioData> {
    log::info!("Connecting to stream {}", url);
    let response = reqwest::blocking::Client::builder()
        .timeout(None::<std::time::Duration>)
        .build()
        .context("Failed to build HTTP client")?
        .get(url)
        .send()
        .with_context(|| format!("Failed to connect to stream: {}", url))?
        .error_for_status()
        .with_context(|| format!("Stream request rejected: {}", url))?;

    let mut hint = Hint::new();
    if let Some(mime) = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        hint.mime_type(mime);
    }

    let reader = SyncReader(Mutex::new(response));
    decode_source(Box::new(ReadOnlySource::new(reader)), hint, Some(max_seconds))
}

/// Gives any `Send` reader the `Sync` bound symphonia's sources require.
struct SyncReader<R>(Mutex<R>);

impl<R: Read> Read for SyncReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.0.get_mut() {
            Ok(inner) => inner.read(buf),
            Err(poisoned) => poisoned.into_inner().read(buf),
        }
    }
}

fn decode_source(
    source: Box<dyn MediaSource>,
    hint: Hint,
    max_seconds: Option<f32>,
) -> Result<AudioData> {
    let mss = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe audio format")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio tracks found")?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count());
    let sample_rate = track.codec_params.sample_rate.context("Unknown sample rate")?;
    let limit = max_seconds.map(|s| (s.max(0.0) * sample_rate as f32) as usize);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        if limit.is_some_and(|l| all_samples.len() >= l) {
            break;
        }

        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        downmix_into(&mut all_samples, sample_buf.samples(), channels);
    }

    if let Some(l) = limit {
        all_samples.truncate(l);
    }

    log::info!(
        "Decoded audio: {} samples, {}Hz, {:.1}s",
        all_samples.len(),
        sample_rate,
        all_samples.len() as f32 / sample_rate as f32
    );

    Ok(AudioData {
        samples: all_samples,
        sample_rate,
    })
}

fn downmix_into(out: &mut Vec<f32>, interleaved: &[f32], channels: usize) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
    } else {
        out.extend(
            interleaved
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_channels() {
        let mut out = Vec::new();
        downmix_into(&mut out, &[1.0, 0.0, 0.5, 0.5], 2);
        assert_eq!(out, vec![0.5, 0.5]);
    }

    #[test]
    fn downmix_mono_passthrough() {
        let mut out = vec![0.25];
        downmix_into(&mut out, &[1.0, -1.0], 1);
        assert_eq!(out, vec![0.25, 1.0, -1.0]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = decode_audio(Path::new("/definitely/not/here.wav"), None).unwrap_err();
        assert!(err.to_string().contains("Failed to open audio file"));
    }
}
