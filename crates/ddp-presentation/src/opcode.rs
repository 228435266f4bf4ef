//! Drawing opcode bytes and coordinate operand encoding (spec §4.3.1).
//!
//! Canonical opcode values are biased by the variant's `opcode_offset` at
//! runtime; the window-claim/status vocabulary is not biased - it branches
//! by variant explicitly in [`crate::claim`] instead.

use ddp_protocol::VariantProfile;

pub const CANON_TEXT: u8 = 0x57;
pub const CANON_BITMAP: u8 = 0x55;
pub const CANON_LINE: u8 = 0x63;
pub const CANON_RECT: u8 = 0x83;
pub const CANON_COMMIT: u8 = 0x39;
pub const CANON_RELEASE: u8 = 0x33;

pub const LINE_VERTICAL: u8 = 0x10;
pub const LINE_HORIZONTAL: u8 = 0x20;

/// The negotiated `region` value observed on every cluster so far, paired
/// with the `Y` offset it implies (spec Open Question 1: `region` stays
/// opaque, but its relationship to the drawable origin is the one derived,
/// stable piece of it).
pub const REGION_DEFAULT: u8 = 0x31;
pub const Y_ORIGIN_DEFAULT: u8 = 0x1B;

/// Derive the `Y` origin offset from the session's negotiated `region`
/// byte. `Y` operands are measured from the claimed region's origin; for
/// the historically observed default region (`0x31`) that origin is
/// `0x1B` above our local coordinate space. An unseen `region` value
/// shifts the origin by the same delta observed between the two, rather
/// than falling back to a single hardcoded constant regardless of what
/// the cluster actually negotiated.
#[must_use]
pub fn y_origin_for(region: Option<u8>) -> u8 {
    match region {
        None | Some(REGION_DEFAULT) => Y_ORIGIN_DEFAULT,
        Some(other) => other.wrapping_sub(REGION_DEFAULT).wrapping_add(Y_ORIGIN_DEFAULT),
    }
}

#[must_use]
pub fn biased(canonical: u8, variant: VariantProfile) -> u8 {
    canonical.wrapping_add(variant.opcode_offset)
}

/// Encode one coordinate operand per the negotiated `coord_bytes` width.
/// 16-bit form is big-endian, matching the COLOR_TYPE1 capability byte's
/// `0x28` opcode-offset family.
#[must_use]
pub fn encode_coord(value: u16, coord_bytes: u8) -> Vec<u8> {
    if coord_bytes >= 2 {
        vec![(value >> 8) as u8, value as u8]
    } else {
        vec![value as u8]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddp_protocol::DisMode;

    #[test]
    fn test_biased_applies_offset() {
        let variant = VariantProfile::for_mode(DisMode::ColorType2);
        assert_eq!(biased(CANON_TEXT, variant), 0x57 + 0x08);
    }

    #[test]
    fn test_encode_coord_single_byte() {
        assert_eq!(encode_coord(200, 1), vec![200]);
    }

    #[test]
    fn test_encode_coord_two_bytes_big_endian() {
        assert_eq!(encode_coord(0x1234, 2), vec![0x12, 0x34]);
    }

    #[test]
    fn test_y_origin_for_default_region() {
        assert_eq!(y_origin_for(Some(REGION_DEFAULT)), Y_ORIGIN_DEFAULT);
        assert_eq!(y_origin_for(None), Y_ORIGIN_DEFAULT);
    }

    #[test]
    fn test_y_origin_for_other_region_shifts_by_observed_delta() {
        assert_eq!(y_origin_for(Some(0x32)), Y_ORIGIN_DEFAULT + 1);
    }
}
