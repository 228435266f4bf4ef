use crate::error::DdpError;
use crate::time::{decode_time_ms, encode_time_ms};

pub const DEFAULT_BS: u8 = 0x0F;
pub const DEFAULT_T1_MS: f64 = 100.0;
pub const DEFAULT_T3_MS: f64 = 5.0;
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TpVersion {
    V1_6,
    V2_0,
}

/// Negotiated transport parameters (spec §3 `params`).
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub bs: u8,
    pub t1_ms: f64,
    pub t3_ms: f64,
    pub ack_timeout_ms: u64,
    pub ka_long: bool,
    pub tp_version: Option<TpVersion>,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            bs: DEFAULT_BS,
            t1_ms: DEFAULT_T1_MS,
            t3_ms: DEFAULT_T3_MS,
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
            ka_long: false,
            tp_version: None,
        }
    }
}

impl SessionParams {
    /// Maximum application-payload bytes per block, given the negotiated `BS`.
    #[must_use]
    pub fn max_bytes_per_block(&self) -> usize {
        (self.bs.saturating_sub(1)) as usize * 7
    }

    /// Absorb a peer `A0`/`A1` payload: caps our `BS` to the peer's proposal,
    /// and for the long (6-byte) form decodes `T1`/`T3` timing bytes.
    pub fn parse(&mut self, data: &[u8]) {
        if data.is_empty() || !matches!(data[0], 0xA0 | 0xA1) {
            return;
        }
        self.bs = self.bs.min(data[1]);
        match data.len() {
            6 => {
                self.tp_version = Some(TpVersion::V2_0);
                self.t1_ms = decode_time_ms(data[2]);
                self.t3_ms = decode_time_ms(data[4]);
                self.ack_timeout_ms = self.t1_ms as u64;
                self.ka_long = true;
            }
            2 | 3 => {
                self.tp_version = Some(TpVersion::V1_6);
                self.ka_long = false;
            }
            n => {
                tracing::warn!(len = n, "invalid A0/A1 params length");
            }
        }
    }

    /// Build our `A1` reply, matching the form (long vs short) last negotiated.
    pub fn build_a1(&self) -> Result<Vec<u8>, DdpError> {
        if self.ka_long || self.tp_version == Some(TpVersion::V2_0) {
            let t1 = encode_time_ms(self.t1_ms)?;
            let t3 = encode_time_ms(self.t3_ms)?;
            Ok(vec![0xA1, self.bs, t1, 0xFF, t3, 0xFF])
        } else {
            Ok(vec![0xA1, self.bs])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_long_form_sets_tp20() {
        let mut params = SessionParams::default();
        params.parse(&[0xA0, 0x0F, 0b01_001010, 0xFF, 0b00_000101, 0xFF]);
        assert_eq!(params.tp_version, Some(TpVersion::V2_0));
        assert!(params.ka_long);
        assert_eq!(params.t1_ms, 10.0);
        assert_eq!(params.t3_ms, 0.5);
    }

    #[test]
    fn test_parse_short_form_sets_tp16() {
        let mut params = SessionParams::default();
        params.parse(&[0xA1, 0x0F]);
        assert_eq!(params.tp_version, Some(TpVersion::V1_6));
        assert!(!params.ka_long);
    }

    #[test]
    fn test_bs_caps_to_peer_minimum() {
        let mut params = SessionParams {
            bs: 0x0F,
            ..Default::default()
        };
        params.parse(&[0xA0, 0x08]);
        assert_eq!(params.bs, 0x08);
    }

    #[test]
    fn test_build_a1_short_form() {
        let params = SessionParams::default();
        assert_eq!(params.build_a1().unwrap(), vec![0xA1, 0x0F]);
    }

    #[test]
    fn test_max_bytes_per_block_default() {
        assert_eq!(SessionParams::default().max_bytes_per_block(), 14 * 7);
    }
}
