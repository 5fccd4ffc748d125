use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use rodio::Source;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEventKind {
    MetadataReady { duration_seconds: f64 },
    TimeUpdate { position_seconds: f64 },
    Ended,
    Failed { message: String },
}

/// Notification from the media engine. `generation` identifies the load the
/// event belongs to so the player can drop notifications from a source that
/// has already been superseded.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub generation: u64,
    pub kind: EngineEventKind,
}

/// Opaque playback device. At most one source is live at a time; `load`
/// tears the previous one down before the new one becomes current.
pub trait MediaEngine {
    fn load(&mut self, source: &Path, generation: u64) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn stop(&mut self);
    fn is_paused(&self) -> bool;
    fn has_source(&self) -> bool;
    fn position(&self) -> Option<Duration>;
    fn duration(&self) -> Option<Duration>;
    fn seek_to(&mut self, position: Duration) -> Result<()>;
    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);
    fn poll_events(&mut self) -> Vec<EngineEvent>;
}

pub struct RodioMediaEngine {
    stream: OutputStream,
    sink: Sink,
    current: Option<PathBuf>,
    generation: u64,
    track_duration: Option<Duration>,
    metadata_reported: bool,
    ended_reported: bool,
    volume: f32,
}

impl RodioMediaEngine {
    pub fn new() -> Result<Self> {
        let mut stream = OutputStreamBuilder::from_default_device()
            .context("failed to open default system output device")?
            .with_error_callback(|_| {})
            .open_stream_or_fallback()
            .context("failed to start output stream")?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());

        Ok(Self {
            stream,
            sink,
            current: None,
            generation: 0,
            track_duration: None,
            metadata_reported: false,
            ended_reported: false,
            volume: 1.0,
        })
    }
}

impl MediaEngine for RodioMediaEngine {
    fn load(&mut self, source: &Path, generation: u64) -> Result<()> {
        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());
        self.current = None;
        self.generation = generation;
        self.track_duration = None;
        self.metadata_reported = false;
        self.ended_reported = false;

        let file = File::open(source)
            .with_context(|| format!("failed to open track {}", source.display()))?;
        let decoded = Decoder::try_from(file)
            .with_context(|| format!("failed to decode {}", source.display()))?;
        self.track_duration = decoded.total_duration();
        self.sink.append(decoded);
        self.sink.pause();
        self.sink.set_volume(self.volume);
        self.current = Some(source.to_path_buf());
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self.current.is_none() {
            anyhow::bail!("no source loaded");
        }
        self.sink.play();
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn stop(&mut self) {
        self.sink.stop();
        self.current = None;
        self.track_duration = None;
    }

    fn is_paused(&self) -> bool {
        self.sink.is_paused()
    }

    fn has_source(&self) -> bool {
        self.current.is_some()
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.sink.get_pos())
    }

    fn duration(&self) -> Option<Duration> {
        self.track_duration
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        if self.current.is_none() {
            anyhow::bail!("no active track");
        }
        self.sink
            .try_seek(position)
            .map_err(|err| anyhow::anyhow!("failed to seek current track: {err:?}"))?;
        self.ended_reported = false;
        Ok(())
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.sink.set_volume(volume);
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        if self.current.is_none() {
            return events;
        }

        if !self.metadata_reported
            && let Some(duration) = self.track_duration
        {
            self.metadata_reported = true;
            events.push(EngineEvent {
                generation: self.generation,
                kind: EngineEventKind::MetadataReady {
                    duration_seconds: duration.as_secs_f64(),
                },
            });
        }

        if self.sink.empty() {
            if !self.ended_reported {
                self.ended_reported = true;
                events.push(EngineEvent {
                    generation: self.generation,
                    kind: EngineEventKind::Ended,
                });
            }
        } else if !self.sink.is_paused() {
            events.push(EngineEvent {
                generation: self.generation,
                kind: EngineEventKind::TimeUpdate {
                    position_seconds: self.sink.get_pos().as_secs_f64(),
                },
            });
        }

        events
    }
}

/// Clock-driven stand-in used when no audio output device is available and
/// by headless tests. Mirrors engine semantics without touching a device.
pub struct NullMediaEngine {
    paused: bool,
    current: Option<PathBuf>,
    generation: u64,
    started_at: Option<Instant>,
    position_offset: Duration,
    volume: f32,
}

impl NullMediaEngine {
    pub fn new() -> Self {
        Self {
            paused: true,
            current: None,
            generation: 0,
            started_at: None,
            position_offset: Duration::ZERO,
            volume: 1.0,
        }
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if !self.paused
            && self.current.is_some()
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed());
        }
        position
    }
}

impl Default for NullMediaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaEngine for NullMediaEngine {
    fn load(&mut self, source: &Path, generation: u64) -> Result<()> {
        self.current = Some(source.to_path_buf());
        self.generation = generation;
        self.paused = true;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self.current.is_none() {
            anyhow::bail!("no source loaded");
        }
        self.paused = false;
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn pause(&mut self) {
        self.position_offset = self.current_position();
        self.started_at = None;
        self.paused = true;
    }

    fn stop(&mut self) {
        self.current = None;
        self.paused = true;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn has_source(&self) -> bool {
        self.current.is_some()
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.current_position())
    }

    fn duration(&self) -> Option<Duration> {
        None
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        if self.current.is_none() {
            anyhow::bail!("no active track");
        }
        self.position_offset = position;
        if !self.paused {
            self.started_at = Some(Instant::now());
        }
        Ok(())
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        if self.current.is_none() || self.paused {
            return Vec::new();
        }
        vec![EngineEvent {
            generation: self.generation,
            kind: EngineEventKind::TimeUpdate {
                position_seconds: self.current_position().as_secs_f64(),
            },
        }]
    }
}
