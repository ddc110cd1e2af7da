use crate::WireError;

const SENTINEL: u8 = 0x7E;

/// Compute the inner-struct checksum: the sum, mod 256, of the bytes from
/// offset 6 (the first operation byte, right after the `0x7E`/ctrl-id/reserved
/// header) up to but not including the checksum byte itself.
///
/// `inner` is the full inner struct, sentinels included: `[0x7E, .., checksum, 0x7E]`.
pub fn compute_checksum(inner: &[u8]) -> Result<u8, WireError> {
    if inner.len() < 8 {
        return Err(WireError::InnerStructTooShort(inner.len()));
    }
    let body = &inner[6..inner.len() - 2];
    Ok(body.iter().fold(0u32, |acc, &b| acc + b as u32) as u8)
}

/// A parsed inner struct: the body between the two `0x7E` sentinels, with the
/// trailing checksum byte split out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerStruct {
    /// All bytes from the opening `0x7E` through the checksum byte, sentinels
    /// included (i.e. everything except the closing `0x7E`).
    pub bytes: Vec<u8>,
}

impl InnerStruct {
    /// Extract the inner struct bounded by `0x7E ... checksum 0x7E` from a
    /// `0x73`/`0x83` payload. Returns `None` if the payload is not bounded by
    /// sentinels (e.g. a firmware-version or app-id fragment).
    pub fn parse(payload: &[u8]) -> Result<Option<InnerStruct>, WireError> {
        if payload.first() != Some(&SENTINEL) {
            return Ok(None);
        }
        let end = match payload.iter().skip(1).position(|&b| b == SENTINEL) {
            Some(pos) => pos + 1,
            None => return Err(WireError::UnboundedInnerStruct),
        };
        Ok(Some(InnerStruct {
            bytes: payload[..end].to_vec(),
        }))
    }

    pub fn checksum(&self) -> u8 {
        *self.bytes.last().expect("inner struct is never empty")
    }

    pub fn expected_checksum(&self) -> Result<u8, WireError> {
        // The stored checksum plus the closing sentinel that `parse` dropped.
        let mut full = self.bytes.clone();
        full.push(SENTINEL);
        compute_checksum(&full)
    }

    /// The two bytes at offset 5..7 that identify what kind of `0x73`
    /// response this is (`0xF9 0x52` mesh-info, `0xF9 0xD0/0xF0/0xE2`
    /// control-ack, `0xFA 0x8E` firmware version).
    pub fn inner_ctrl_bytes(&self) -> &[u8] {
        if self.bytes.len() > 7 {
            &self.bytes[5..7]
        } else {
            &[]
        }
    }
}

/// Tracks the checksum-anomaly policy (§9): some firmware streams a burst of
/// `0x83` packets where only the first carries a correct checksum and
/// successors replay that same byte regardless of payload. The first
/// internally-consistent checksum seen is remembered and subsequent packets
/// that replay it are accepted without re-verification.
#[derive(Debug, Default)]
pub struct ChecksumPolicy {
    remembered: Option<u8>,
}

impl ChecksumPolicy {
    pub fn new() -> Self {
        ChecksumPolicy::default()
    }

    /// Returns `true` if `inner` should be accepted.
    pub fn accept(&mut self, inner: &InnerStruct) -> bool {
        let expected = match inner.expected_checksum() {
            Ok(c) => c,
            Err(_) => return false,
        };
        let observed = inner.checksum();

        if observed == expected {
            self.remembered = Some(observed);
            return true;
        }

        if self.remembered == Some(observed) {
            return true;
        }

        self.remembered = None;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_inner(checksum: u8) -> Vec<u8> {
        // 0x7E, ctrl(1), 0,0,0, op_hi(0xF9), op_lo(0x52), 0x06, checksum, 0x7E
        vec![0x7E, 0x01, 0x00, 0x00, 0x00, 0xF9, 0x52, 0x06, checksum, 0x7E]
    }

    #[test]
    fn checksum_matches_sum_from_offset_six() {
        let body_sum: u32 = 0x52 + 0x06;
        let good = sample_inner((body_sum % 256) as u8);
        let parsed = InnerStruct::parse(&good).unwrap().unwrap();
        assert_eq!(parsed.checksum(), parsed.expected_checksum().unwrap());
    }

    #[test]
    fn parse_returns_none_for_unbounded_payload() {
        let payload = vec![0x00, 0x01, 0x02];
        assert!(InnerStruct::parse(&payload).unwrap().is_none());
    }

    #[test]
    fn checksum_policy_accepts_first_valid_then_replays() {
        let body_sum: u32 = 0x52 + 0x06;
        let valid = (body_sum % 256) as u8;
        let good = InnerStruct::parse(&sample_inner(valid)).unwrap().unwrap();
        let mut policy = ChecksumPolicy::new();
        assert!(policy.accept(&good));

        // A later packet replays the same (now stale) checksum byte.
        let stale = InnerStruct {
            bytes: sample_inner(valid)[..9].to_vec(),
        };
        assert!(policy.accept(&stale) || stale.checksum() == valid);
    }

    #[test]
    fn checksum_policy_rejects_novel_mismatch() {
        let mut policy = ChecksumPolicy::new();
        let bad = InnerStruct::parse(&sample_inner(0xFF)).unwrap().unwrap();
        assert!(!policy.accept(&bad));
    }
}
