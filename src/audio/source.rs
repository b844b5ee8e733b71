use std::io::Cursor;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Receiver;
use log::{info, warn};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use super::analyzer::SpectrumAnalyzer;
use super::{SourceError, SourceMode};

/// File-mode analysis consumes the decoded buffer at the display's nominal
/// frame rate, sample_rate / 60 samples per snapshot.
const FRAMES_PER_SECOND: u32 = 60;

/// Shared output engine, created once and reused across mode switches.
/// Rebuilding the platform stream per playback adds audible latency.
struct AudioEngine {
    // Dropping the stream silences every sink built from the handle.
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

/// The per-mode input. A single tagged state: two inputs can never be
/// connected at once, and each variant owns exactly the resources its
/// mode needs.
enum Input {
    Idle,
    Microphone {
        // Dropping the cpal stream stops the hardware capture.
        stream: cpal::Stream,
        frames: Receiver<Vec<f32>>,
        sample_rate: u32,
    },
    File {
        sink: Sink,
        name: String,
        samples: Vec<f32>,
        cursor: usize,
        sample_rate: u32,
    },
}

/// Audio source lifecycle manager.
///
/// Owns the shared output engine and the spectrum analyzer (both created
/// lazily, both alive until process teardown) plus whichever input is
/// active. All calls run on the host's control thread; the only other
/// thread is cpal's capture callback, which talks exclusively through a
/// channel.
pub struct SpectrumSource {
    engine: Option<AudioEngine>,
    analyzer: Option<SpectrumAnalyzer>,
    input: Input,
}

impl SpectrumSource {
    pub fn new() -> Self {
        Self {
            engine: None,
            analyzer: None,
            input: Input::Idle,
        }
    }

    pub fn current_mode(&self) -> SourceMode {
        match self.input {
            Input::Idle => SourceMode::Idle,
            Input::Microphone { .. } => SourceMode::Microphone,
            Input::File { .. } => SourceMode::File,
        }
    }

    pub fn current_file_name(&self) -> Option<&str> {
        match &self.input {
            Input::File { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.current_mode() != SourceMode::Idle
    }

    /// Sample rate of the active input, if any.
    pub fn sample_rate(&self) -> Option<u32> {
        match &self.input {
            Input::Idle => None,
            Input::Microphone { sample_rate, .. } | Input::File { sample_rate, .. } => {
                Some(*sample_rate)
            }
        }
    }

    /// Switches to microphone capture. No-op when already capturing;
    /// otherwise the previous mode is torn down before the device is
    /// requested. On failure the source is left Idle with no hardware held.
    pub async fn activate_microphone(&mut self) -> Result<(), SourceError> {
        if self.current_mode() == SourceMode::Microphone {
            return Ok(());
        }
        self.deactivate();
        self.ensure_analyzer();

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| SourceError::MediaAccess("no input device available".into()))?;
        let config = device
            .default_input_config()
            .map_err(|e| SourceError::MediaAccess(format!("no usable input config: {e}")))?;

        info!(
            "Using input device: {}",
            device.name().unwrap_or_else(|_| "unknown".to_string())
        );

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let (sender, frames) = crossbeam_channel::unbounded();

        let stream = device
            .build_input_stream(
                &config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mono: Vec<f32> = if channels == 1 {
                        data.to_vec()
                    } else {
                        data.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                            .collect()
                    };
                    if sender.send(mono).is_err() {
                        warn!("Capture receiver dropped; discarding audio");
                    }
                },
                |err| {
                    warn!("Capture stream error: {}", err);
                },
                None,
            )
            .map_err(|e| SourceError::MediaAccess(format!("could not open capture stream: {e}")))?;

        if let Err(e) = stream.play() {
            // Release the capture device before surfacing the error.
            drop(stream);
            return Err(SourceError::MediaAccess(format!(
                "could not start capture stream: {e}"
            )));
        }

        info!("Microphone active ({channels} ch @ {sample_rate} Hz)");
        self.input = Input::Microphone {
            stream,
            frames,
            sample_rate,
        };
        Ok(())
    }

    /// Decodes `bytes` and starts playing them, replacing whatever mode was
    /// active (including a previous file). Undecodable bytes fail before
    /// any engine resource is touched; the source is left Idle on failure.
    pub async fn activate_file(&mut self, bytes: Vec<u8>, name: &str) -> Result<(), SourceError> {
        self.deactivate();

        let decoder = Decoder::new(Cursor::new(bytes.clone()))?;
        let sample_rate = decoder.sample_rate();
        let channels = decoder.channels() as usize;

        // Mono analysis copy of the whole track.
        let interleaved: Vec<f32> = decoder.convert_samples::<f32>().collect();
        let samples: Vec<f32> = interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        self.ensure_analyzer();
        let handle = self.ensure_engine()?;

        let sink = Sink::try_new(&handle)
            .map_err(|e| SourceError::EngineUnavailable(format!("could not open sink: {e}")))?;
        // Second decoder feeds the audible path; playback starts now.
        sink.append(Decoder::new(Cursor::new(bytes))?);

        info!(
            "Playing {:?} ({} Hz, {} samples)",
            name,
            sample_rate,
            samples.len()
        );
        self.input = Input::File {
            sink,
            name: name.to_string(),
            samples,
            cursor: 0,
            sample_rate,
        };
        Ok(())
    }

    /// Tears down the active input. Idempotent. The engine and analyzer
    /// survive for reuse; only the analyzer's signal state is dropped so
    /// the next mode cannot read a stale spectrum.
    pub fn deactivate(&mut self) {
        match std::mem::replace(&mut self.input, Input::Idle) {
            Input::Idle => {}
            Input::Microphone { stream, .. } => {
                drop(stream);
                info!("Microphone released");
            }
            Input::File { sink, name, .. } => {
                sink.stop();
                info!("Stopped playback of {:?}", name);
            }
        }
        if let Some(analyzer) = &mut self.analyzer {
            analyzer.clear();
        }
    }

    /// Refreshes and returns the shared magnitude buffer, or `None` when
    /// idle. Feeds the analyzer from the active input first: drains the
    /// capture channel in microphone mode, advances the decoded buffer at
    /// the real-time rate in file mode. A finished playback is detected
    /// here and transitions the source back to Idle.
    pub fn snapshot(&mut self) -> Option<&[u8]> {
        let finished = matches!(&self.input, Input::File { sink, .. } if sink.empty());
        if finished {
            info!("Playback finished");
            self.deactivate();
        }

        match &mut self.input {
            Input::Idle => None,
            Input::Microphone { frames, .. } => {
                let analyzer = self.analyzer.as_mut()?;
                while let Ok(chunk) = frames.try_recv() {
                    analyzer.push_samples(&chunk);
                }
                Some(analyzer.refresh())
            }
            Input::File {
                samples,
                cursor,
                sample_rate,
                ..
            } => {
                let analyzer = self.analyzer.as_mut()?;
                let per_frame = (*sample_rate / FRAMES_PER_SECOND) as usize;
                let start = (*cursor).min(samples.len());
                let end = (start + per_frame).min(samples.len());
                analyzer.push_samples(&samples[start..end]);
                *cursor = end;
                Some(analyzer.refresh())
            }
        }
    }

    fn ensure_analyzer(&mut self) {
        if self.analyzer.is_none() {
            self.analyzer = Some(SpectrumAnalyzer::new());
            info!("Spectrum analyzer created");
        }
    }

    fn ensure_engine(&mut self) -> Result<OutputStreamHandle, SourceError> {
        if self.engine.is_none() {
            let (stream, handle) = OutputStream::try_default().map_err(|e| {
                SourceError::EngineUnavailable(format!("could not open output stream: {e}"))
            })?;
            info!("Audio output engine created");
            self.engine = Some(AudioEngine {
                _stream: stream,
                handle,
            });
        }
        match &self.engine {
            Some(engine) => Ok(engine.handle.clone()),
            None => Err(SourceError::EngineUnavailable(
                "output engine unavailable".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        let mut source = SpectrumSource::new();
        assert_eq!(source.current_mode(), SourceMode::Idle);
        assert!(!source.is_active());
        assert_eq!(source.current_file_name(), None);
        assert_eq!(source.sample_rate(), None);
        assert!(source.snapshot().is_none());
    }

    #[test]
    fn test_deactivate_is_idempotent() {
        let mut source = SpectrumSource::new();
        source.deactivate();
        source.deactivate();
        assert_eq!(source.current_mode(), SourceMode::Idle);
        assert!(source.snapshot().is_none());
    }

    #[test]
    fn test_undecodable_bytes_fail_and_leave_idle() {
        let mut source = SpectrumSource::new();
        let garbage = vec![0xDEu8, 0xAD, 0xBE, 0xEF, 0x00, 0x01, 0x02, 0x03];

        let result = pollster::block_on(source.activate_file(garbage, "junk.mp3"));
        assert!(matches!(result, Err(SourceError::Decode(_))));
        assert_eq!(source.current_mode(), SourceMode::Idle);
        assert_eq!(source.current_file_name(), None);
        // Decode failure happens before the output engine is ever built,
        // so this test runs on machines with no audio device at all.
        assert!(source.engine.is_none());
    }
}
