//! The UI-facing draw-command stream (spec §6).

use serde::{Deserialize, Serialize};

/// `flags` bit `0x80` = inverted background; `0x02` = opaque; low nibble
/// selects a font. Matches the wire `flags` byte directly so callers can
/// pass `0x06` (opaque, font 6) as the documented default.
pub const FLAG_INVERTED: u8 = 0x80;
pub const FLAG_OPAQUE: u8 = 0x02;
pub const DEFAULT_TEXT_FLAGS: u8 = 0x06;

/// One record of the line-delimited JSON stream the UI layer submits on the
/// command-stream endpoint (spec §6, ambient transport per SPEC_FULL.md).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear,
    ClearArea { x: u16, y: u16, w: u16, h: u16 },
    DrawText {
        text: String,
        x: u16,
        y: u16,
        #[serde(default = "default_text_flags")]
        flags: u8,
    },
    DrawBitmap { x: u16, y: u16, icon_name: String },
    DrawLine { x: u16, y: u16, length: u16, vertical: bool },
    DrawRect { x: u16, y: u16, w: u16, h: u16, color: u8 },
    Commit,
}

fn default_text_flags() -> u8 {
    DEFAULT_TEXT_FLAGS
}

impl DrawCommand {
    #[must_use]
    pub fn draw_text(text: impl Into<String>, x: u16, y: u16) -> Self {
        Self::DrawText { text: text.into(), x, y, flags: DEFAULT_TEXT_FLAGS }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip_draw_text() {
        let cmd = DrawCommand::draw_text("Hello", 0, 1);
        let json = serde_json::to_string(&cmd).unwrap();
        let parsed: DrawCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(cmd, parsed);
    }

    #[test]
    fn test_draw_text_flags_default_when_absent() {
        let json = r#"{"command":"draw_text","text":"Hi","x":0,"y":1}"#;
        let parsed: DrawCommand = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, DrawCommand::DrawText { text: "Hi".into(), x: 0, y: 1, flags: DEFAULT_TEXT_FLAGS });
    }

    #[test]
    fn test_commit_json_shape() {
        let json = serde_json::to_string(&DrawCommand::Commit).unwrap();
        assert_eq!(json, r#"{"command":"commit"}"#);
    }
}
