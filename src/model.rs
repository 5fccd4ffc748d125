use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayMode {
    Sequential,
    Random,
    RepeatOne,
}

impl PlayMode {
    pub fn next(self) -> Self {
        match self {
            Self::Sequential => Self::Random,
            Self::Random => Self::RepeatOne,
            Self::RepeatOne => Self::Sequential,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sequential => "Sequential",
            Self::Random => "Random",
            Self::RepeatOne => "Repeat One",
        }
    }
}

/// One catalog entry. `catalog_index` always equals the track's position in
/// the catalog's backing sequence and is rewritten on every shuffle.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: Option<String>,
    pub name: String,
    pub artist: String,
    pub audio_ref: String,
    pub cover_ref: Option<String>,
    pub raw_lyric: Option<String>,
    pub has_timed_lyric: bool,
    pub duration_seconds: f64,
    pub catalog_index: usize,
}

impl Track {
    pub fn playable_extension(&self) -> bool {
        const PLAYABLE: &[&str] = &["mp3", "wav", "ogg", "m4a", "flac"];
        let ext = self.audio_ref.rsplit('.').next().unwrap_or_default();
        PLAYABLE.iter().any(|known| ext.eq_ignore_ascii_case(known))
    }
}

/// One lyric line. `time_seconds` is `None` for display-only lines that can
/// never become active by playback time.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricCue {
    pub time_seconds: Option<f64>,
    pub text: String,
}
