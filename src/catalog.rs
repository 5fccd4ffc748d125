use crate::model::Track;
use anyhow::{Context, Result};
use rand::Rng;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog document has no \"songs\" list")]
    MissingSongs,
    #[error("catalog document is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct SongRecord {
    #[serde(default)]
    id: Option<String>,
    song_name: String,
    song_author: String,
    song_file: String,
    #[serde(default)]
    cover_file: Option<String>,
    #[serde(default)]
    song_lyric: Option<String>,
    #[serde(default)]
    has_scroll_lyric: bool,
}

/// The authoritative track sequence. Built once at startup, reordered only
/// by [`Catalog::shuffle`]; search derives views without touching it.
#[derive(Debug, Default)]
pub struct Catalog {
    tracks: Vec<Track>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog file {}", path.display()))?;
        let catalog = Self::from_json(&raw)
            .with_context(|| format!("failed to parse catalog file {}", path.display()))?;
        Ok(catalog)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let document: serde_json::Value = serde_json::from_str(raw)?;
        let Some(songs) = document.get("songs").filter(|value| value.is_array()) else {
            return Err(CatalogError::MissingSongs);
        };

        let records: Vec<SongRecord> = serde_json::from_value(songs.clone())?;
        let tracks = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| Track {
                id: record.id,
                name: record.song_name,
                artist: record.song_author,
                audio_ref: record.song_file,
                cover_ref: record.cover_file,
                raw_lyric: record.song_lyric,
                has_timed_lyric: record.has_scroll_lyric,
                duration_seconds: 0.0,
                catalog_index: index,
            })
            .collect();

        Ok(Self { tracks })
    }

    pub fn from_tracks(mut tracks: Vec<Track>) -> Self {
        for (index, track) in tracks.iter_mut().enumerate() {
            track.catalog_index = index;
        }
        Self { tracks }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn set_duration(&mut self, index: usize, seconds: f64) {
        if let Some(track) = self.tracks.get_mut(index) {
            track.duration_seconds = seconds;
        }
    }

    pub fn index_of_id(&self, id: &str) -> Option<usize> {
        self.tracks
            .iter()
            .position(|track| track.id.as_deref() == Some(id))
    }

    /// In-place Fisher-Yates permutation followed by a full reindex. Returns
    /// the new position of the track whose stable `id` matches `active_id`
    /// so the player can re-point its current index. Tracks without an `id`
    /// cannot be recovered after the reorder.
    pub fn shuffle(&mut self, rng: &mut impl Rng, active_id: Option<&str>) -> Option<usize> {
        for i in (1..self.tracks.len()).rev() {
            let j = rng.random_range(0..=i);
            self.tracks.swap(i, j);
        }

        for (position, track) in self.tracks.iter_mut().enumerate() {
            track.catalog_index = position;
        }

        active_id.and_then(|id| self.index_of_id(id))
    }
}
