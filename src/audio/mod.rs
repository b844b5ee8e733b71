pub mod analyzer;
pub mod source;

pub use analyzer::SpectrumAnalyzer;
pub use source::SpectrumSource;

use thiserror::Error;

/// Which input the source is currently wired to. Exactly one holds at a
/// time; transitions always tear the previous mode down first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    Idle,
    Microphone,
    File,
}

/// Failures surfaced by source activation. None are fatal: every error
/// path leaves the source in a consistent mode with no hardware held.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Permission denied, no capture device, or the device refused a stream.
    #[error("audio input unavailable: {0}")]
    MediaAccess(String),

    /// The supplied bytes are not a supported audio format.
    #[error("could not decode audio data: {0}")]
    Decode(#[from] rodio::decoder::DecoderError),

    /// The platform output engine could not be constructed.
    #[error("audio engine unavailable: {0}")]
    EngineUnavailable(String),
}
