use crate::audio::{EngineEvent, EngineEventKind, MediaEngine};
use crate::catalog::Catalog;
use crate::lyrics::{self, LyricCursor};
use crate::model::{LyricCue, PlayMode, Track};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Loaded,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Outbound notifications consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    TrackChanged(usize),
    PlaybackChanged(bool),
    TimeChanged { position_seconds: f64, duration_clock: String },
    ActiveCueChanged(Option<usize>),
    ModeChanged(PlayMode),
    ShuffleCompleted,
    PlaybackError(String),
}

/// The playback controller. Owns the catalog, the current index, the mode
/// and the lyric cursor for the loaded track. `current_index` is always a
/// catalog index; view positions are resolved before they reach this type.
pub struct Player {
    pub catalog: Catalog,
    media_root: PathBuf,
    current_index: usize,
    mode: PlayMode,
    state: PlayerState,
    generation: u64,
    position_seconds: f64,
    cues: Vec<LyricCue>,
    cursor: LyricCursor,
    rng: SmallRng,
    events: VecDeque<PlayerEvent>,
    pub status: String,
}

impl Player {
    pub fn new(catalog: Catalog, media_root: PathBuf) -> Self {
        Self {
            catalog,
            media_root,
            current_index: 0,
            mode: PlayMode::Sequential,
            state: PlayerState::Idle,
            generation: 0,
            position_seconds: 0.0,
            cues: Vec::new(),
            cursor: LyricCursor::default(),
            rng: SmallRng::from_os_rng(),
            events: VecDeque::new(),
            status: String::from("Ready"),
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
    }

    pub fn position_seconds(&self) -> f64 {
        self.position_seconds
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.catalog.get(self.current_index)
    }

    pub fn cues(&self) -> &[LyricCue] {
        &self.cues
    }

    pub fn active_cue(&self) -> Option<usize> {
        self.cursor.active()
    }

    pub fn take_events(&mut self) -> Vec<PlayerEvent> {
        self.events.drain(..).collect()
    }

    fn emit(&mut self, event: PlayerEvent) {
        self.events.push_back(event);
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
    }

    fn source_path(&self, track: &Track) -> PathBuf {
        self.media_root.join("songs").join(&track.audio_ref)
    }

    fn duration_clock(&self) -> String {
        let duration = self
            .current_track()
            .map(|track| track.duration_seconds)
            .unwrap_or(0.0);
        format_clock(duration)
    }

    /// Loads the first track without starting playback, as done at startup
    /// when the catalog is non-empty.
    pub fn load_initial(&mut self, engine: &mut dyn MediaEngine) {
        if !self.catalog.is_empty() {
            self.load_track(engine, 0);
        }
    }

    /// Silent no-op when `index` is out of range. Otherwise re-points the
    /// current index, resets displayed time, rebuilds the lyric timeline,
    /// bumps the load generation and hands the new source to the engine.
    /// The old source is stopped before the new one is loaded; playback
    /// resumes only after the load succeeds.
    pub fn load_track(&mut self, engine: &mut dyn MediaEngine, index: usize) {
        let Some(track) = self.catalog.get(index) else {
            return;
        };
        let source = self.source_path(track);
        let name = track.name.clone();
        let raw_lyric = track.raw_lyric.clone();
        let has_timed = track.has_timed_lyric;
        let resume = self.state == PlayerState::Playing;

        self.current_index = index;
        self.position_seconds = 0.0;
        self.generation += 1;
        self.cues = lyrics::parse_timeline(raw_lyric.as_deref(), has_timed);
        self.cursor.reset();

        if resume {
            engine.stop();
        }

        self.emit(PlayerEvent::TrackChanged(index));
        let duration_clock = self.duration_clock();
        self.emit(PlayerEvent::TimeChanged {
            position_seconds: 0.0,
            duration_clock,
        });
        self.emit(PlayerEvent::ActiveCueChanged(None));

        match engine.load(&source, self.generation) {
            Ok(()) => {
                self.state = PlayerState::Loaded;
                self.set_status(&format!("Loaded {name}"));
                if resume {
                    self.play(engine);
                }
            }
            Err(err) => {
                self.state = PlayerState::Loaded;
                self.set_status(&format!("cannot play {name}: {err:#}"));
                self.emit(PlayerEvent::PlaybackChanged(false));
                self.emit(PlayerEvent::PlaybackError(name));
            }
        }
    }

    /// Asks the engine to start. A refusal (no device, autoplay policy)
    /// leaves the state machine untouched and is surfaced once; there is no
    /// automatic retry.
    pub fn play(&mut self, engine: &mut dyn MediaEngine) {
        match engine.play() {
            Ok(()) => {
                self.state = PlayerState::Playing;
                self.set_status("Playing");
                self.emit(PlayerEvent::PlaybackChanged(true));
            }
            Err(err) => {
                let name = self
                    .current_track()
                    .map(|track| track.name.clone())
                    .unwrap_or_default();
                self.set_status(&format!("playback refused: {err:#}"));
                self.emit(PlayerEvent::PlaybackError(name));
            }
        }
    }

    pub fn pause(&mut self, engine: &mut dyn MediaEngine) {
        engine.pause();
        if self.state == PlayerState::Playing {
            self.state = PlayerState::Paused;
        }
        self.set_status("Paused");
        self.emit(PlayerEvent::PlaybackChanged(false));
    }

    pub fn toggle_play(&mut self, engine: &mut dyn MediaEngine) {
        if engine.has_source() {
            if self.is_playing() {
                self.pause(engine);
            } else {
                self.play(engine);
            }
        } else if !self.catalog.is_empty() {
            self.load_track(engine, 0);
            self.play(engine);
        }
    }

    pub fn next(&mut self, engine: &mut dyn MediaEngine) {
        self.advance(engine, Direction::Forward);
    }

    pub fn previous(&mut self, engine: &mut dyn MediaEngine) {
        self.advance(engine, Direction::Backward);
    }

    fn advance(&mut self, engine: &mut dyn MediaEngine, direction: Direction) {
        let Some(target) = self.advance_target(direction) else {
            return;
        };
        self.load_track(engine, target);
        self.play(engine);
    }

    fn advance_target(&mut self, direction: Direction) -> Option<usize> {
        let len = self.catalog.len();
        if len == 0 {
            return None;
        }

        Some(match self.mode {
            PlayMode::RepeatOne => self.current_index,
            PlayMode::Random => self.random_target(len),
            PlayMode::Sequential => match direction {
                Direction::Forward => (self.current_index + 1) % len,
                Direction::Backward => (self.current_index + len - 1) % len,
            },
        })
    }

    /// Uniform draw over the other N-1 tracks, enforced by resampling so
    /// the distribution stays uniform. Degenerate catalogs stay in place.
    fn random_target(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        loop {
            let candidate = self.rng.random_range(0..len);
            if candidate != self.current_index {
                return candidate;
            }
        }
    }

    /// End-of-track notification. Repeat One restarts the same source from
    /// zero without reloading; every other mode advances forward.
    fn handle_track_ended(&mut self, engine: &mut dyn MediaEngine) {
        if self.mode == PlayMode::RepeatOne {
            self.position_seconds = 0.0;
            if engine.seek_to(Duration::ZERO).is_ok() {
                self.play(engine);
            } else {
                // Some sinks drop the source once it has drained.
                self.load_track(engine, self.current_index);
                self.play(engine);
            }
        } else {
            self.next(engine);
        }
    }

    pub fn set_mode(&mut self, mode: PlayMode) {
        self.mode = mode;
        self.set_status(&format!("Mode: {}", mode.label()));
        self.emit(PlayerEvent::ModeChanged(mode));
    }

    pub fn cycle_mode(&mut self) {
        self.set_mode(self.mode.next());
    }

    /// Seek expressed as a fraction of the track duration, clamped to
    /// [0, 1]. A no-op while the duration is still unknown.
    pub fn seek_to_fraction(&mut self, engine: &mut dyn MediaEngine, fraction: f64) {
        let duration = self
            .current_track()
            .map(|track| track.duration_seconds)
            .unwrap_or(0.0);
        if !duration.is_finite() || duration <= 0.0 {
            return;
        }

        let target = fraction.clamp(0.0, 1.0) * duration;
        if engine.seek_to(Duration::from_secs_f64(target)).is_ok() {
            self.position_seconds = target;
            let duration_clock = self.duration_clock();
            self.emit(PlayerEvent::TimeChanged {
                position_seconds: target,
                duration_clock,
            });
        }
    }

    pub fn set_volume(&mut self, engine: &mut dyn MediaEngine, level: f32) {
        let level = level.clamp(0.0, 1.0);
        engine.set_volume(level);
        self.set_status(&format!("Volume: {}%", (level * 100.0).round() as u16));
    }

    pub fn note_lyric_scroll(&mut self, now: Instant) {
        self.cursor.note_manual_scroll(now);
    }

    /// True while a recent manual scroll suppresses auto-centering.
    pub fn lyric_hold_active(&self, now: Instant) -> bool {
        self.cursor.hold_active(now)
    }

    /// Feeds one engine notification through the state machine. Events
    /// whose generation predates the latest load belong to a superseded
    /// source and are dropped.
    pub fn handle_engine_event(
        &mut self,
        engine: &mut dyn MediaEngine,
        event: EngineEvent,
        now: Instant,
    ) {
        if event.generation != self.generation {
            return;
        }

        match event.kind {
            EngineEventKind::MetadataReady { duration_seconds } => {
                self.catalog.set_duration(self.current_index, duration_seconds);
                let duration_clock = self.duration_clock();
                self.emit(PlayerEvent::TimeChanged {
                    position_seconds: self.position_seconds,
                    duration_clock,
                });
            }
            EngineEventKind::TimeUpdate { position_seconds } => {
                self.position_seconds = position_seconds;
                let duration_clock = self.duration_clock();
                self.emit(PlayerEvent::TimeChanged {
                    position_seconds,
                    duration_clock,
                });
                let update = self.cursor.resolve(&self.cues, position_seconds, now);
                if update.changed {
                    self.emit(PlayerEvent::ActiveCueChanged(update.active));
                }
            }
            EngineEventKind::Ended => self.handle_track_ended(engine),
            EngineEventKind::Failed { message } => {
                let name = self
                    .current_track()
                    .map(|track| track.name.clone())
                    .unwrap_or_default();
                self.state = PlayerState::Loaded;
                self.set_status(&format!("cannot play {name}: {message}"));
                self.emit(PlayerEvent::PlaybackChanged(false));
                self.emit(PlayerEvent::PlaybackError(name));
            }
        }
    }

    /// Reorders the catalog in place and re-points `current_index` at the
    /// same logical track via its stable `id`. Tracks without an `id` lose
    /// the association and the index is left where it was. Playback is not
    /// interrupted.
    pub fn shuffle(&mut self) {
        let active_id = self.current_track().and_then(|track| track.id.clone());
        if let Some(new_index) = self.catalog.shuffle(&mut self.rng, active_id.as_deref()) {
            self.current_index = new_index;
        }
        self.set_status("Catalog shuffled");
        self.emit(PlayerEvent::ShuffleCompleted);
    }
}

/// `minutes:seconds`, seconds zero-padded. Unknown durations (NaN or
/// infinite) format as `0:00`.
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return String::from("0:00");
    }
    let total = seconds as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
