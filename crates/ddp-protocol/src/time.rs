//! Timing byte codec used by the long-form `A0`/`A1` handshake (spec §4.2.3).
//!
//! A timing byte packs a 2-bit decade exponent in the high bits and a 6-bit
//! scale in the low bits: `value_ms = 0.1 * 10^units * scale`.

use crate::error::DdpError;

#[must_use]
pub fn decode_time_ms(byte: u8) -> f64 {
    let units = u32::from(byte >> 6);
    let scale = f64::from(byte & 0x3F);
    let base_ms = 0.1 * 10f64.powi(units as i32);
    base_ms * scale
}

/// Inverse of [`decode_time_ms`]: picks the smallest decade exponent that
/// represents `ms` exactly as an integer scale in `0..=63`.
pub fn encode_time_ms(ms: f64) -> Result<u8, DdpError> {
    for units in 0u32..4 {
        let base_ms = 0.1 * 10f64.powi(units as i32);
        let scale = ms / base_ms;
        if (scale - scale.round()).abs() < 1e-6 && (0.0..=63.0).contains(&scale) {
            return Ok(((units as u8) << 6) | (scale.round() as u8));
        }
    }
    Err(DdpError::Protocol(format!("cannot encode time {ms}ms")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_time_matches_reference_scale() {
        // units=1 (base 1.0ms), scale=0x0A -> 10ms
        assert_eq!(decode_time_ms(0b01_001010), 10.0);
        // units=0 (base 0.1ms), scale=5 -> 0.5ms
        assert_eq!(decode_time_ms(0b00_000101), 0.5);
    }

    #[test]
    fn test_encode_time_roundtrips() {
        let byte = encode_time_ms(100.0).unwrap();
        assert_eq!(decode_time_ms(byte), 100.0);
    }

    #[test]
    fn test_encode_time_rejects_out_of_range() {
        assert!(encode_time_ms(1_000_000.0).is_err());
    }
}
