use crate::{PacketType, RawPacket, WireError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::warn;

/// Reassembles `[type:1][reserved:2][len_hi:1][len_lo:1][payload]` frames out
/// of a byte stream that carries no other message boundaries.
///
/// Unknown header bytes are logged and the buffer is advanced past the bad
/// byte rather than treated as a fatal error (§4.1 decode-error policy).
#[derive(Debug, Default)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = RawPacket;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RawPacket>, WireError> {
        loop {
            if src.is_empty() {
                return Ok(None);
            }

            let header = src[0];
            let packet_type = match PacketType::from_byte(header) {
                Ok(t) => t,
                Err(_) => {
                    warn!(header = format!("{header:#04x}"), "unknown packet header, skipping byte");
                    src.advance(1);
                    continue;
                }
            };

            if src.len() < 5 {
                return Ok(None);
            }

            let len = ((src[3] as usize) << 8) | (src[4] as usize);
            let total = 5 + len;
            if src.len() < total {
                return Ok(None);
            }

            let mut frame = src.split_to(total);
            let payload = frame.split_off(5);
            return Ok(Some(RawPacket::new(packet_type, payload.to_vec())));
        }
    }
}
