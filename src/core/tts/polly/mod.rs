mod config;
mod provider;

pub use config::{DEFAULT_ENGINE, DEFAULT_VOICE_ID, SynthesisTier, TtsOutputFormat};
pub use provider::{PollySynthesizer, PollySynthesizerConfig};
