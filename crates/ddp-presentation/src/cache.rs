//! Render cache (spec §3 "Render cache (presentation-owned)"): the
//! authoritative record of what the screen currently shows, used to replay
//! the frame after a cluster-driven pre-emption and to suppress redundant
//! redraws.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::command::DrawCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CommandKind {
    Text,
    Bitmap,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CommandKey {
    kind: CommandKind,
    y: u16,
    x: u16,
}

/// `(opcode_kind, y, x) -> last command issued at that slot`.
#[derive(Debug, Default, Clone)]
pub struct CommandCache {
    entries: HashMap<CommandKey, DrawCommand>,
}

impl CommandCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn record(&mut self, command: DrawCommand) {
        let key = match &command {
            DrawCommand::DrawText { x, y, .. } => CommandKey { kind: CommandKind::Text, y: *y, x: *x },
            DrawCommand::DrawBitmap { x, y, .. } => CommandKey { kind: CommandKind::Bitmap, y: *y, x: *x },
            DrawCommand::DrawLine { x, y, .. } => CommandKey { kind: CommandKind::Line, y: *y, x: *x },
            // Clear/ClearArea/Commit/DrawRect are not replayed on resume -
            // only persistent content slots are cached, matching the
            // original's `command_cache` which only ever holds
            // draw_text/draw_bitmap/draw_line entries.
            _ => return,
        };
        self.entries.insert(key, command);
    }

    /// Commands in ascending `(y, x)` order, the replay order required by
    /// spec §4.3.3.
    #[must_use]
    pub fn ordered(&self) -> Vec<DrawCommand> {
        let mut keyed: Vec<_> = self.entries.iter().collect();
        keyed.sort_by_key(|(k, _)| (k.y, k.x));
        keyed.into_iter().map(|(_, v)| v.clone()).collect()
    }
}

/// `row-y -> (content_hash, text_length, inverted)` (spec §3, §4.3.5).
#[derive(Debug, Default, Clone)]
pub struct LineCache {
    rows: HashMap<u16, LineEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineEntry {
    hash: u64,
    length: usize,
    inverted: bool,
}

/// What happened to a line on the latest `draw_text` at that row, driving
/// the artifact-cleanup rules in spec §4.3.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineUpdate {
    /// Identical `(hash, length, inverted)` - caller should suppress the draw.
    Unchanged,
    /// Text shrank; caller must clear the abandoned trailing pixels.
    Shrunk { previous_length: usize },
    /// Inversion flipped true -> false; caller must clear the full line first.
    InversionCleared,
    /// First draw at this row, or any other change - draw normally.
    Changed,
}

impl LineCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Check and record a text draw at `y`, returning what changed.
    pub fn update(&mut self, y: u16, text: &str, inverted: bool) -> LineUpdate {
        let hash = hash_text(text);
        let length = text.chars().count();
        let update = match self.rows.get(&y) {
            Some(prev) if prev.hash == hash && prev.length == length && prev.inverted == inverted => {
                LineUpdate::Unchanged
            }
            Some(prev) if prev.inverted && !inverted => LineUpdate::InversionCleared,
            Some(prev) if length < prev.length => LineUpdate::Shrunk { previous_length: prev.length },
            _ => LineUpdate::Changed,
        };
        self.rows.insert(y, LineEntry { hash, length, inverted });
        update
    }
}

fn hash_text(text: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_cache_replays_in_yx_order() {
        let mut cache = CommandCache::new();
        cache.record(DrawCommand::draw_text("b", 5, 2));
        cache.record(DrawCommand::draw_text("a", 0, 1));
        let ordered = cache.ordered();
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0], DrawCommand::draw_text("a", 0, 1));
    }

    #[test]
    fn test_command_cache_overwrites_same_slot() {
        let mut cache = CommandCache::new();
        cache.record(DrawCommand::draw_text("first", 0, 0));
        cache.record(DrawCommand::draw_text("second", 0, 0));
        assert_eq!(cache.ordered(), vec![DrawCommand::draw_text("second", 0, 0)]);
    }

    #[test]
    fn test_line_cache_suppresses_unchanged_redraw() {
        let mut cache = LineCache::new();
        assert_eq!(cache.update(1, "Hello", false), LineUpdate::Changed);
        assert_eq!(cache.update(1, "Hello", false), LineUpdate::Unchanged);
    }

    #[test]
    fn test_line_cache_detects_shrink() {
        let mut cache = LineCache::new();
        cache.update(1, "Hello World", false);
        assert_eq!(cache.update(1, "Hi", false), LineUpdate::Shrunk { previous_length: 11 });
    }

    #[test]
    fn test_line_cache_detects_inversion_clear() {
        let mut cache = LineCache::new();
        cache.update(1, "Hello", true);
        assert_eq!(cache.update(1, "Hello", false), LineUpdate::InversionCleared);
    }
}
