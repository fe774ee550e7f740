pub mod base;
pub mod polly;

pub use base::{
    SpeechSynthesizer, SynthesisRequest, SynthesizedSpeech, TtsError, TtsResult, VoiceDescription,
};
pub use polly::{PollySynthesizer, PollySynthesizerConfig, SynthesisTier, TtsOutputFormat};
