use crate::core::geo::LatLng;
use serde::{Deserialize, Serialize};

/// One settled map view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub zoom: u8,
    pub center: LatLng,
}

impl HistoryEntry {
    pub fn new(zoom: u8, center: LatLng) -> Self {
        Self { zoom, center }
    }
}

/// Undo/redo trail of settled views.
///
/// Every settled move is recorded after the cursor, discarding nothing:
/// stepping back and then panning splices the new view in between the old
/// neighbors rather than truncating the forward branch. Traversal itself
/// must not pollute the trail, so `back`, `forward` and `reload` arm a
/// one-shot suppression consumed by the next `record` call.
#[derive(Debug, Clone, Default)]
pub struct ViewHistory {
    entries: Vec<HistoryEntry>,
    index: usize,
    suppressed: bool,
}

impl ViewHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the trail at the view the map first settled on.
    pub fn with_initial(entry: HistoryEntry) -> Self {
        Self {
            entries: vec![entry],
            index: 0,
            suppressed: false,
        }
    }

    /// Records a settled view, unless this settle was caused by a traversal.
    pub fn record(&mut self, entry: HistoryEntry) {
        if self.suppressed {
            self.suppressed = false;
            return;
        }
        if self.entries.is_empty() {
            self.entries.push(entry);
            self.index = 0;
        } else {
            self.index += 1;
            self.entries.insert(self.index, entry);
        }
    }

    /// Steps the cursor back, returning the view to restore. `None` at the
    /// start of the trail.
    pub fn back(&mut self) -> Option<HistoryEntry> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        self.suppressed = true;
        Some(self.entries[self.index])
    }

    /// Steps the cursor forward, returning the view to restore. `None` at
    /// the end of the trail.
    pub fn forward(&mut self) -> Option<HistoryEntry> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        self.suppressed = true;
        Some(self.entries[self.index])
    }

    /// Drops everything after the initial view and returns it. `None` when
    /// nothing was ever recorded.
    pub fn reload(&mut self) -> Option<HistoryEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.entries.truncate(1);
        self.index = 0;
        self.suppressed = true;
        Some(self.entries[0])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.index)
    }
}
