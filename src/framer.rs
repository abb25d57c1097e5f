//! Incremental framing of the inbound byte stream. The transport delivers
//! arbitrary chunks; a chunk may hold a fragment of one message, exactly one,
//! or several back to back. The framer buffers bytes and splits off each
//! complete BER message as soon as its definite length is satisfied.

use crate::error::LdapError;
use crate::proto::{self, LdapMessage};
use bytes::BytesMut;

/// Top-level LDAP message is always a SEQUENCE (BER tag 0x30). Any other
/// leading tag means the stream is corrupt, which is unrecoverable here.
const LDAP_MESSAGE_SEQUENCE_TAG: u8 = 0x30;

#[derive(Debug, Default)]
pub struct MessageFramer {
    buffer: BytesMut,
}

impl MessageFramer {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Append one transport delivery and drain every complete message it
    /// completes. An empty result means the buffered prefix is still partial.
    /// Any malformed data is a fatal framing error; the connection must be
    /// torn down.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<LdapMessage>, LdapError> {
        self.buffer.extend_from_slice(bytes);
        let mut messages = Vec::new();
        while let Some(total) = frame_length(&self.buffer)? {
            if self.buffer.len() < total {
                break;
            }
            let frame = self.buffer.split_to(total);
            messages.push(proto::parse_message(&frame)?);
        }
        Ok(messages)
    }

    /// True when no unconsumed bytes are buffered. The StartTLS upgrade
    /// requires this before the transport swap: the server must not send
    /// plaintext past its StartTLS acceptance.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[cfg(test)]
    fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// Total byte length of the leading message (tag + length header + content),
/// or None when more bytes are needed to know.
fn frame_length(buf: &[u8]) -> Result<Option<usize>, LdapError> {
    if buf.len() < 2 {
        return Ok(None);
    }
    if buf[0] != LDAP_MESSAGE_SEQUENCE_TAG {
        return Err(LdapError::Framing(format!(
            "expected SEQUENCE tag 0x30 at frame start, got 0x{:02X}",
            buf[0]
        )));
    }
    let first_byte = buf[1];
    if (first_byte & 0x80) == 0 {
        // Short form
        return Ok(Some(2 + first_byte as usize));
    }
    // Long form
    let length_bytes = (first_byte & 0x7F) as usize;
    if length_bytes == 0 || length_bytes > 4 {
        return Err(LdapError::Framing(format!(
            "invalid length encoding ({} length bytes)",
            length_bytes
        )));
    }
    if buf.len() < 2 + length_bytes {
        return Ok(None);
    }
    let mut length = 0usize;
    for i in 0..length_bytes {
        length = (length << 8) | buf[2 + i] as usize;
    }
    Ok(Some(2 + length_bytes + length))
}
