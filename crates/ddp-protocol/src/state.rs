#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    SessionActive,
    Initializing,
    Ready,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisMode {
    Unknown,
    White,
    Red,
    ColorType1,
    ColorType2,
    MonoHybrid,
}

impl DisMode {
    /// Color variants resume immediately on a "free" status; mono/white/red
    /// wait for an explicit re-init request (spec §4.3.3).
    #[must_use]
    pub fn is_color(self) -> bool {
        matches!(self, DisMode::ColorType1 | DisMode::ColorType2)
    }
}

/// Rendering variant parameters derived from the initialization handshake
/// (spec §3, §4.2.4 step 4 / §4.3.1).
#[derive(Debug, Clone, Copy)]
pub struct VariantProfile {
    pub opcode_offset: u8,
    pub coord_bytes: u8,
}

impl Default for VariantProfile {
    fn default() -> Self {
        Self {
            opcode_offset: 0x00,
            coord_bytes: 1,
        }
    }
}

impl VariantProfile {
    #[must_use]
    pub fn for_mode(mode: DisMode) -> Self {
        match mode {
            DisMode::ColorType1 => Self {
                opcode_offset: 0x28,
                coord_bytes: 2,
            },
            DisMode::ColorType2 => Self {
                opcode_offset: 0x08,
                coord_bytes: 1,
            },
            DisMode::White | DisMode::Red | DisMode::MonoHybrid | DisMode::Unknown => {
                Self::default()
            }
        }
    }
}
