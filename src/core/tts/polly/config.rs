//! Configuration types for the Amazon Polly synthesis backend.
//!
//! Engine and output-format options mirror what Polly's SynthesizeSpeech
//! API accepts; unrecognized values fall back to sensible defaults rather
//! than failing, matching how the request handlers treat them.

use serde::{Deserialize, Serialize};

/// Voice used when a request does not name one.
pub const DEFAULT_VOICE_ID: &str = "Joanna";

/// Engine used when a request does not name one.
pub const DEFAULT_ENGINE: SynthesisTier = SynthesisTier::Neural;

// =============================================================================
// Synthesis Tier
// =============================================================================

/// Amazon Polly synthesis engine options.
///
/// Different engines provide different quality/latency trade-offs:
/// - **Standard**: Basic TTS, lowest latency
/// - **Neural**: High-quality neural voices, recommended default
/// - **LongForm**: Optimized for longer content like articles
/// - **Generative**: Latest generative voices with best quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SynthesisTier {
    #[serde(rename = "standard")]
    Standard,
    #[default]
    #[serde(rename = "neural")]
    Neural,
    #[serde(rename = "long-form")]
    LongForm,
    #[serde(rename = "generative")]
    Generative,
}

impl SynthesisTier {
    /// Convert to the Polly API string.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Neural => "neural",
            Self::LongForm => "long-form",
            Self::Generative => "generative",
        }
    }

    /// Parse from string, with fallback to Neural.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "standard" => Self::Standard,
            "neural" => Self::Neural,
            "long-form" | "longform" | "long_form" => Self::LongForm,
            "generative" => Self::Generative,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for SynthesisTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Output Format
// =============================================================================

/// Audio output formats supported by Amazon Polly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TtsOutputFormat {
    /// MP3 format (default, compressed)
    #[default]
    #[serde(rename = "mp3")]
    Mp3,
    /// OGG Vorbis format (compressed)
    #[serde(rename = "ogg_vorbis")]
    OggVorbis,
    /// PCM format (uncompressed, 16-bit signed little-endian)
    #[serde(rename = "pcm")]
    Pcm,
}

impl TtsOutputFormat {
    /// Convert to the Polly API string.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::OggVorbis => "ogg_vorbis",
            Self::Pcm => "pcm",
        }
    }

    /// Get the MIME type for this format.
    #[inline]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::OggVorbis => "audio/ogg",
            Self::Pcm => "audio/pcm",
        }
    }

    /// Parse from string, with fallback to Mp3.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "mp3" | "mpeg" => Self::Mp3,
            "ogg_vorbis" | "ogg" | "vorbis" => Self::OggVorbis,
            "pcm" | "linear16" | "raw" => Self::Pcm,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for TtsOutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
