/// Render a firmware-version byte string the same way for both the bound
/// (`0x73`/`0xFA 0x8E`) and unbound (`0x83`, leading `0x00`) encodings:
/// `fw_len == 5` → `"{0}.{1}.{2..}"`, `fw_len == 2` → `"{0}.{1}"` (§B).
pub(crate) fn format_firmware_bytes(bytes: &[u8]) -> Option<String> {
    match bytes.len() {
        5 => Some(format!(
            "{}.{}.{}",
            bytes[0],
            bytes[1],
            bytes[2..]
                .iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
                .join("")
        )),
        2 => Some(format!("{}.{}", bytes[0], bytes[1])),
        _ => None,
    }
}

/// Parse the firmware-version payload carried in an unbound `0x83` packet
/// (first byte `0x00`, no `0x7E` boundaries): `[0x00, kind, fw_len,
/// fw_bytes...]`. The device/network distinction in `kind` is not modeled
/// separately (§3's `Device` carries a single `firmware_version` field), so
/// the variant is dropped here.
pub fn parse_unbound_firmware_version(payload: &[u8]) -> Option<String> {
    if payload.first() != Some(&0x00) {
        return None;
    }
    let fw_len = *payload.get(2)? as usize;
    let fw_bytes = payload.get(3..3 + fw_len)?;
    format_firmware_bytes(fw_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unbound_five_byte_version() {
        let payload = vec![0x00, 0x00, 0x05, 1, 2, 3, 4, 5];
        assert_eq!(
            parse_unbound_firmware_version(&payload).as_deref(),
            Some("1.2.345")
        );
    }

    #[test]
    fn rejects_bound_payload() {
        let payload = vec![0x7E, 0x00, 0x05, 1, 2, 3, 4, 5];
        assert!(parse_unbound_firmware_version(&payload).is_none());
    }
}
