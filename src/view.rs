use crate::catalog::Catalog;
use std::ops::Range;

/// Filtered, order-preserving projection of the catalog. Rows hold catalog
/// indices so "the Nth visible item" always resolves back to the real
/// playback index, never a view position.
#[derive(Debug, Default)]
pub struct SearchView {
    query: String,
    entries: Vec<usize>,
}

impl SearchView {
    pub fn new(catalog: &Catalog) -> Self {
        let mut view = Self::default();
        view.refresh(catalog);
        view
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, catalog: &Catalog, query: &str) {
        self.query = query.to_string();
        self.refresh(catalog);
    }

    /// Full re-run of the filter pass. Must be called after every catalog
    /// mutation (shuffle) so stale indices never leak into the view.
    pub fn refresh(&mut self, catalog: &Catalog) {
        self.entries = filter_indices(catalog, &self.query);
    }

    pub fn entries(&self) -> &[usize] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maps a view position to its catalog index.
    pub fn resolve(&self, view_position: usize) -> Option<usize> {
        self.entries.get(view_position).copied()
    }

    /// View position of a catalog index, if the track is currently visible.
    pub fn position_of(&self, catalog_index: usize) -> Option<usize> {
        self.entries.iter().position(|idx| *idx == catalog_index)
    }
}

/// Case-insensitive substring match over track name and artist. A blank
/// query yields the full catalog in order.
pub fn filter_indices(catalog: &Catalog, query: &str) -> Vec<usize> {
    let needle = query.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return (0..catalog.len()).collect();
    }

    catalog
        .tracks()
        .iter()
        .filter(|track| {
            track.name.to_ascii_lowercase().contains(&needle)
                || track.artist.to_ascii_lowercase().contains(&needle)
        })
        .map(|track| track.catalog_index)
        .collect()
}

/// Byte range of the first case-insensitive occurrence of `query` in
/// `text`, for display highlighting only.
pub fn highlight_span(text: &str, query: &str) -> Option<Range<usize>> {
    let needle = query.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return None;
    }
    let start = text.to_ascii_lowercase().find(&needle)?;
    Some(start..start + needle.len())
}
