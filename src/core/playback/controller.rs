//! Playback session controller.
//!
//! `ReaderSession` is the state machine behind every play gesture. It
//! decides which synthesis backend to use (remote when authenticated,
//! on-device otherwise), fetches remote audio through [`SpeechApi`],
//! drives the [`PlaybackEngine`] adapter, tracks progress with a polling
//! task, and persists user preferences on every change.
//!
//! States: `Idle -> Loading -> Playing <-> Paused`. Changing the text,
//! voice, or engine (or seeking) discards the current handle and
//! returns to `Idle`; a failed remote fetch degrades to local synthesis
//! instead of surfacing a hard failure.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::engine::PlaybackEngine;
use super::local::LocalSynthesis;
use super::prefs::{
    self, DEFAULT_VOICE_KEY, EngineChoice, PrefStore, SPEED_INCREMENT, clamp_speed,
};
use super::{AudioClip, Backend, estimated_duration_secs};
use crate::client::{SpeakRequest, SpeechApi, TokenProvider};
use crate::core::tts::VoiceDescription;

/// How often the progress poller samples the engine while playing.
pub const PROGRESS_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Session playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    Playing,
    Paused,
}

/// Engine-side notifications, bridged out of the audio callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The current clip played to the end
    Ended,
    /// The platform refused to play the current clip
    PlaybackFailed,
}

// =============================================================================
// Voice options
// =============================================================================

/// Rendering tiers offered in the voice picker. Standard-only voices are
/// not listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceTier {
    Neural,
    Generative,
}

impl VoiceTier {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "neural" => Some(Self::Neural),
            "generative" => Some(Self::Generative),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neural => "neural",
            Self::Generative => "generative",
        }
    }

    /// Sort rank: neural before generative.
    fn rank(&self) -> u8 {
        match self {
            Self::Neural => 0,
            Self::Generative => 1,
        }
    }
}

/// One selectable voice/tier pair.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceOption {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub language_name: String,
    pub tier: VoiceTier,
}

impl VoiceOption {
    /// Composite selection key, e.g. `"Ruth:neural"`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.id, self.tier.as_str())
    }
}

/// Expand each remote voice into one option per supported tier and sort
/// by display name, then tier rank.
pub fn expand_voice_options(voices: &[VoiceDescription]) -> Vec<VoiceOption> {
    let mut options: Vec<VoiceOption> = Vec::new();
    for voice in voices {
        for engine in &voice.engine {
            if let Some(tier) = VoiceTier::parse(engine) {
                options.push(VoiceOption {
                    id: voice.id.clone(),
                    name: voice.name.clone(),
                    gender: voice.gender.clone(),
                    language_name: voice.language_name.clone(),
                    tier,
                });
            }
        }
    }
    options.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then(a.tier.rank().cmp(&b.tier.rank()))
    });
    options
}

// =============================================================================
// Session controller
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct Progress {
    elapsed: f32,
    total: f32,
    percent: f32,
}

/// The UI-level playback coordinator.
pub struct ReaderSession {
    engine: Arc<dyn PlaybackEngine>,
    api: Arc<dyn SpeechApi>,
    tokens: Arc<dyn TokenProvider>,
    local: Arc<dyn LocalSynthesis>,
    prefs: PrefStore,

    state: SessionState,
    authenticated: bool,
    text: String,
    volume: f32,
    speed: f32,
    voice_key: String,
    engine_choice: EngineChoice,

    /// Which backend produced the live handle, if any
    engine_in_use: Option<Backend>,
    /// Whether a fetched/synthesized clip is loaded in the engine
    has_clip: bool,
    /// Bumped on every reset; in-flight fetches from older generations
    /// are discarded when they resolve.
    generation: u64,

    progress: Arc<Mutex<Progress>>,
    poll_cancel: Option<CancellationToken>,

    voice_options: Vec<VoiceOption>,
    error: Option<String>,

    events_rx: Option<UnboundedReceiver<SessionEvent>>,
}

impl ReaderSession {
    pub fn new(
        engine: Arc<dyn PlaybackEngine>,
        api: Arc<dyn SpeechApi>,
        tokens: Arc<dyn TokenProvider>,
        local: Arc<dyn LocalSynthesis>,
        prefs: PrefStore,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        // Bind completion/error continuations now; the engine re-binds
        // them to every handle it creates from here on.
        let tx = events_tx.clone();
        engine.on_end(Arc::new(move || {
            let _ = tx.send(SessionEvent::Ended);
        }));
        let tx = events_tx.clone();
        engine.on_error(Arc::new(move || {
            let _ = tx.send(SessionEvent::PlaybackFailed);
        }));

        let restored = prefs.preferences().clone();

        Self {
            engine,
            api,
            tokens,
            local,
            prefs,
            state: SessionState::Idle,
            authenticated: false,
            text: String::new(),
            volume: 1.0,
            speed: restored.speed,
            voice_key: restored.voice,
            engine_choice: restored.engine,
            engine_in_use: None,
            has_clip: false,
            generation: 0,
            progress: Arc::new(Mutex::new(Progress::default())),
            poll_cancel: None,
            voice_options: Vec::new(),
            error: None,
            events_rx: Some(events_rx),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == SessionState::Playing
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn voice_key(&self) -> &str {
        &self.voice_key
    }

    pub fn voice_options(&self) -> &[VoiceOption] {
        &self.voice_options
    }

    pub fn banner_dismissed(&self) -> bool {
        self.prefs.preferences().banner_dismissed
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.progress.lock().elapsed
    }

    pub fn total_secs(&self) -> f32 {
        self.progress.lock().total
    }

    pub fn progress_percent(&self) -> f32 {
        self.progress.lock().percent
    }

    /// The backend a play gesture would use right now: unauthenticated
    /// sessions are forced to local synthesis.
    pub fn effective_backend(&self) -> Backend {
        if !self.authenticated {
            Backend::Local
        } else {
            match self.engine_choice {
                EngineChoice::Local => Backend::Local,
                EngineChoice::Remote => Backend::Remote,
            }
        }
    }

    /// Take the event receiver; the owner pumps received events back in
    /// through [`handle_event`](Self::handle_event).
    pub fn take_events(&mut self) -> Option<UnboundedReceiver<SessionEvent>> {
        self.events_rx.take()
    }

    // ── Input changes ─────────────────────────────────────────────────

    /// Replace the text to read. Any in-progress playback is discarded.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text == self.text {
            return;
        }
        self.text = text;
        self.reset_session();
    }

    /// Select a voice by composite key (`"Ruth:neural"`; bare ids get the
    /// default tier). Persisted immediately; discards playback.
    pub fn select_voice(&mut self, key: &str) {
        let key = prefs::normalize_voice_key(key);
        if key == self.voice_key {
            return;
        }
        self.voice_key = key;
        self.prefs.set_voice(&self.voice_key);
        self.reset_session();
    }

    /// Choose the preferred engine. Persisted immediately; discards
    /// playback. Takes effect only while authenticated.
    pub fn set_engine_choice(&mut self, choice: EngineChoice) {
        if choice == self.engine_choice {
            return;
        }
        self.engine_choice = choice;
        self.prefs.set_engine(choice);
        self.reset_session();
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.engine.set_volume(self.volume);
    }

    /// Set the playback speed, clamped to the supported range and
    /// persisted. Applied live to a remote handle.
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = clamp_speed(speed);
        self.prefs.set_speed(self.speed);
        if self.engine_in_use == Some(Backend::Remote) && self.has_clip {
            self.engine.set_speed(self.speed);
        }
    }

    pub fn increase_speed(&mut self) {
        self.set_speed(self.speed + SPEED_INCREMENT);
    }

    pub fn decrease_speed(&mut self) {
        self.set_speed(self.speed - SPEED_INCREMENT);
    }

    pub fn dismiss_banner(&mut self) {
        self.prefs.set_banner_dismissed(true);
    }

    // ── Playback gestures ─────────────────────────────────────────────

    /// The play/pause toggle.
    pub async fn play_pause(&mut self) {
        self.error = None;
        match self.state {
            SessionState::Playing => {
                self.engine.pause();
                self.stop_polling();
                self.state = SessionState::Paused;
            }
            SessionState::Paused => {
                // Resume, not re-fetch, while the handle and backend are
                // unchanged.
                if self.has_clip && self.engine_in_use == Some(self.effective_backend()) {
                    self.engine.resume();
                    self.state = SessionState::Playing;
                    self.start_polling();
                } else {
                    self.start_speech().await;
                }
            }
            SessionState::Idle => self.start_speech().await,
            // A gesture while a fetch is in flight is ignored; the fetch
            // already in progress decides the outcome.
            SessionState::Loading => {}
        }
    }

    /// Seek via the progress control. Mid-stream seeking is not
    /// supported: the position is displayed, but the session restarts
    /// from `Idle` on the next play.
    pub fn seek(&mut self, fraction: f32) {
        let fraction = fraction.clamp(0.0, 1.0);
        {
            let mut p = self.progress.lock();
            p.percent = fraction * 100.0;
            p.elapsed = fraction * p.total;
        }
        self.reset_session();
    }

    /// Authentication transitions. Login makes the remote backend the
    /// engine of choice and loads the voice catalog; logout reverts to
    /// local-only.
    pub async fn set_authenticated(&mut self, authenticated: bool) {
        if self.authenticated == authenticated {
            return;
        }
        self.authenticated = authenticated;
        self.reset_session();

        if authenticated {
            self.engine_choice = EngineChoice::Remote;
            self.prefs.set_engine(EngineChoice::Remote);
            if let Err(e) = self.load_voices().await {
                warn!(error = %e, "Failed to load voices");
            }
        } else {
            self.voice_options.clear();
        }
    }

    /// Fetch and expand the remote voice catalog. When the current
    /// selection is absent from the new list, it resets to the default
    /// voice and tier.
    pub async fn load_voices(&mut self) -> Result<(), crate::client::ApiError> {
        if !self.authenticated {
            self.voice_options.clear();
            return Ok(());
        }
        let Some(token) = self.tokens.token().await else {
            return Ok(());
        };

        let voices = self.api.voices(&token).await?;
        self.voice_options = expand_voice_options(&voices);

        let selected = self.voice_key.clone();
        if !self.voice_options.iter().any(|o| o.key() == selected) {
            self.select_voice(DEFAULT_VOICE_KEY);
        }
        Ok(())
    }

    /// Handle an engine notification previously taken from the event
    /// receiver.
    pub fn handle_event(&mut self, event: SessionEvent) {
        // Notifications for handles we already discarded are stale.
        if !matches!(self.state, SessionState::Playing | SessionState::Paused) {
            return;
        }
        match event {
            SessionEvent::Ended => {
                self.stop_polling();
                {
                    let mut p = self.progress.lock();
                    p.percent = 100.0;
                    p.elapsed = p.total;
                }
                self.state = SessionState::Idle;
                self.has_clip = false;
                self.engine_in_use = None;
            }
            SessionEvent::PlaybackFailed => {
                self.stop_polling();
                self.state = SessionState::Idle;
                self.has_clip = false;
                self.engine_in_use = None;
                self.error = Some("Error playing audio".to_string());
            }
        }
    }

    // ── Internals ─────────────────────────────────────────────────────

    async fn start_speech(&mut self) {
        if self.text.trim().is_empty() {
            return;
        }
        {
            let mut p = self.progress.lock();
            p.elapsed = 0.0;
            p.percent = 0.0;
        }
        match self.effective_backend() {
            Backend::Remote => self.start_remote().await,
            Backend::Local => self.start_local().await,
        }
    }

    async fn start_remote(&mut self) {
        self.state = SessionState::Loading;
        let generation = self.generation;

        let Some(token) = self.tokens.token().await else {
            // No session token: remote is unavailable for this attempt.
            self.error = Some("Not authenticated".to_string());
            self.start_local().await;
            return;
        };

        let (voice_id, tier) = self
            .voice_key
            .split_once(':')
            .map(|(id, tier)| (id.to_string(), tier.to_string()))
            .unwrap_or_else(|| (self.voice_key.clone(), prefs::DEFAULT_TIER.to_string()));

        let request = SpeakRequest {
            text: self.text.clone(),
            voice_id,
            engine: tier,
            output_format: "mp3".to_string(),
            speed: self.speed,
        };

        match self.api.synthesize(&request, &token).await {
            Ok(clip) => {
                if generation != self.generation {
                    debug!("Discarding synthesis result from a superseded play request");
                    return;
                }
                self.begin_playback(clip, Backend::Remote);
            }
            Err(e) => {
                if generation != self.generation {
                    return;
                }
                warn!(error = %e, "Remote synthesis failed, falling back to local speech");
                self.error = Some(e.to_string());
                self.start_local().await;
            }
        }
    }

    async fn start_local(&mut self) {
        self.state = SessionState::Loading;
        let generation = self.generation;

        match self.local.synthesize(&self.text, self.speed).await {
            Ok(clip) => {
                if generation != self.generation {
                    return;
                }
                self.begin_playback(clip, Backend::Local);
            }
            Err(e) => {
                if generation != self.generation {
                    return;
                }
                self.state = SessionState::Idle;
                self.error = Some(format!("Speech synthesis failed: {e}"));
            }
        }
    }

    fn begin_playback(&mut self, clip: AudioClip, backend: Backend) {
        // Local clips are synthesized at the requested rate already.
        let rate = match backend {
            Backend::Remote => self.speed,
            Backend::Local => 1.0,
        };
        self.engine.load(clip, rate);
        self.engine.set_volume(self.volume);
        self.has_clip = true;
        self.engine_in_use = Some(backend);

        // Prefer the real duration once the handle reports one; the
        // word-count estimate covers the gap.
        let reported = self.engine.duration();
        let total = if reported > 0.0 {
            reported
        } else {
            estimated_duration_secs(&self.text, self.speed)
        };
        {
            let mut p = self.progress.lock();
            p.elapsed = 0.0;
            p.percent = 0.0;
            p.total = total;
        }

        self.state = SessionState::Playing;
        self.start_polling();
    }

    /// Tear down the current playback intent: supersede in-flight
    /// fetches, stop the engine (releasing its clip), and return to Idle.
    fn reset_session(&mut self) {
        self.generation += 1;
        self.stop_polling();
        self.engine.stop();
        self.has_clip = false;
        self.engine_in_use = None;
        self.state = SessionState::Idle;
    }

    fn start_polling(&mut self) {
        self.stop_polling();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let engine = Arc::clone(&self.engine);
        let progress = Arc::clone(&self.progress);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PROGRESS_POLL_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let elapsed = engine.position();
                        let reported = engine.duration();
                        let mut p = progress.lock();
                        if reported > 0.0 {
                            p.total = reported;
                        }
                        p.elapsed = elapsed;
                        if p.total > 0.0 {
                            p.percent = ((elapsed / p.total) * 100.0).min(100.0);
                        }
                    }
                }
            }
        });

        self.poll_cancel = Some(cancel);
    }

    fn stop_polling(&mut self) {
        if let Some(cancel) = self.poll_cancel.take() {
            cancel.cancel();
        }
    }
}

impl Drop for ReaderSession {
    fn drop(&mut self) {
        self.stop_polling();
        self.engine.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(id: &str, name: &str, engines: &[&str]) -> VoiceDescription {
        VoiceDescription {
            id: id.to_string(),
            name: name.to_string(),
            gender: "Female".to_string(),
            engine: engines.iter().map(|s| s.to_string()).collect(),
            language_code: "en-US".to_string(),
            language_name: "US English".to_string(),
        }
    }

    #[test]
    fn expansion_splits_tiers_and_sorts() {
        let voices = vec![
            voice("Ruth", "Ruth", &["neural", "generative"]),
            voice("Amy", "Amy", &["generative", "neural"]),
            voice("Brian", "Brian", &["standard"]),
        ];

        let options = expand_voice_options(&voices);
        let keys: Vec<String> = options.iter().map(|o| o.key()).collect();
        assert_eq!(
            keys,
            vec![
                "Amy:neural",
                "Amy:generative",
                "Ruth:neural",
                "Ruth:generative"
            ]
        );
    }

    #[test]
    fn standard_only_voices_are_dropped() {
        let voices = vec![voice("Raveena", "Raveena", &["standard"])];
        assert!(expand_voice_options(&voices).is_empty());
    }

    #[test]
    fn tier_parse_rejects_unknown() {
        assert_eq!(VoiceTier::parse("neural"), Some(VoiceTier::Neural));
        assert_eq!(VoiceTier::parse("generative"), Some(VoiceTier::Generative));
        assert_eq!(VoiceTier::parse("standard"), None);
        assert_eq!(VoiceTier::parse("long-form"), None);
    }
}
