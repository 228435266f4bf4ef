//! Fixed byte sequences recognized on the incoming identifier (spec §4.2.2).

pub const KA_WHITE_OPEN: [u8; 6] = [0xA0, 0x0F, 0x8A, 0xFF, 0x4A, 0xFF];
pub const KA_RED_PRESENT: [u8; 3] = [0xA0, 0x07, 0x00];
pub const KA_COLOR_PRESENT: [u8; 3] = [0xA0, 0x0F, 0x00];
pub const KA_RED_OPEN_SHORT: [u8; 2] = [0xA1, 0x0F];
pub const KA_PING: u8 = 0xA3;
pub const KA_CLOSE: [u8; 1] = [0xA8];

pub const CMD_REINIT_REQ: u8 = 0x2E;
pub const CMD_REINIT_CONF: [u8; 1] = [0x2F];

/// Mono/Red busy statuses (prefix `0x53`) - cluster has claimed the screen.
pub const STAT_BUSY: [[u8; 2]; 4] = [[0x53, 0x84], [0x53, 0x04], [0x53, 0x88], [0x53, 0x08]];
/// Mono/Red free statuses - cluster is releasing, a re-init request follows.
pub const STAT_FREE: [[u8; 2]; 2] = [[0x53, 0x05], [0x53, 0x0A]];
/// Color busy statuses (prefix `0x7B`).
pub const STAT_COLOR_BUSY: [[u8; 2]; 4] = [[0x7B, 0x84], [0x7B, 0x04], [0x7B, 0x88], [0x7B, 0x08]];
/// Color free statuses - resume is immediate, no re-init handshake.
pub const STAT_COLOR_FREE: [[u8; 2]; 2] = [[0x7B, 0x05], [0x7B, 0x0A]];

#[must_use]
pub fn is_busy_status(payload: &[u8]) -> bool {
    STAT_BUSY.iter().any(|s| s.as_slice() == payload)
        || STAT_COLOR_BUSY.iter().any(|s| s.as_slice() == payload)
}

#[must_use]
pub fn is_color_free_status(payload: &[u8]) -> bool {
    STAT_COLOR_FREE.iter().any(|s| s.as_slice() == payload)
}

#[must_use]
pub fn is_mono_free_status(payload: &[u8]) -> bool {
    STAT_FREE.iter().any(|s| s.as_slice() == payload)
}
