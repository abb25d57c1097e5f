// LDAP v3 message codec with BER encoding/decoding (RFC 4511).
// Covers the operations the protocol engine exchanges: bind, extended, unbind.

use crate::error::LdapError;
use std::io::{Cursor, Read};

type Result<T> = std::result::Result<T, LdapError>;

fn framing(msg: impl Into<String>) -> LdapError {
    LdapError::Framing(msg.into())
}

/// LDAP result code: success.
pub const RESULT_SUCCESS: i32 = 0;
/// LDAP result code: saslBindInProgress, the server expects another SASL round.
pub const RESULT_SASL_BIND_IN_PROGRESS: i32 = 14;

/// OID for the StartTLS extended operation (RFC 4511 §4.14).
pub const START_TLS_OID: &str = "1.3.6.1.4.1.1466.20037";
/// OID for the WhoAmI extended operation (RFC 4532).
pub const WHOAMI_OID: &str = "1.3.6.1.4.1.4203.1.11.3";

/// The fixed StartTLS request: well-known OID, no request value.
pub fn start_tls_request() -> ProtocolOp {
    ProtocolOp::ExtendedRequest(ExtendedRequest {
        request_name: START_TLS_OID.to_string(),
        request_value: None,
    })
}

/// WhoAmI request: a no-payload extended operation, useful as a liveness probe.
pub fn whoami_request() -> ProtocolOp {
    ProtocolOp::ExtendedRequest(ExtendedRequest {
        request_name: WHOAMI_OID.to_string(),
        request_value: None,
    })
}

// LDAP message envelope: message id plus one protocol operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapMessage {
    pub message_id: i32,
    pub protocol_op: ProtocolOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolOp {
    BindRequest(BindRequest),
    BindResponse(BindResponse),
    UnbindRequest,
    ExtendedRequest(ExtendedRequest),
    ExtendedResponse(ExtendedResponse),
}

impl ProtocolOp {
    /// Operation name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolOp::BindRequest(_) => "BindRequest",
            ProtocolOp::BindResponse(_) => "BindResponse",
            ProtocolOp::UnbindRequest => "UnbindRequest",
            ProtocolOp::ExtendedRequest(_) => "ExtendedRequest",
            ProtocolOp::ExtendedResponse(_) => "ExtendedResponse",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindRequest {
    pub version: i32,
    pub name: String,
    pub authentication: BindAuthentication,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindAuthentication {
    Simple(String),
    Sasl { mechanism: String, credentials: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindResponse {
    pub result_code: i32,
    pub matched_dn: String,
    pub diagnostic_message: String,
    /// serverSaslCreds [7]: challenge for the next SASL round, when present.
    pub server_sasl_creds: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedRequest {
    pub request_name: String,
    pub request_value: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedResponse {
    pub result_code: i32,
    pub matched_dn: String,
    pub diagnostic_message: String,
    pub response_name: Option<String>,
    pub response_value: Option<Vec<u8>>,
}

// LDAP protocol tag constants
pub const LDAP_TAG_BIND_REQUEST: u8 = 0x60;
pub const LDAP_TAG_BIND_RESPONSE: u8 = 0x61;
pub const LDAP_TAG_UNBIND_REQUEST: u8 = 0x42;
pub const LDAP_TAG_EXTENDED_REQUEST: u8 = 0x77;
pub const LDAP_TAG_EXTENDED_RESPONSE: u8 = 0x78;

/// Context [0] IMPLICIT: simple bind password / extended requestName.
const TAG_CTX_0: u8 = 0x80;
/// Context [1] IMPLICIT: extended requestValue.
const TAG_CTX_1: u8 = 0x81;
/// Context [3] constructed: SaslCredentials in a bind request, referral in a result.
const TAG_CTX_3_CONSTRUCTED: u8 = 0xA3;
/// Context [7] IMPLICIT: serverSaslCreds in a bind response.
const TAG_CTX_7: u8 = 0x87;
/// Context [10]/[11] IMPLICIT: extended responseName / responseValue.
const TAG_CTX_10: u8 = 0x8A;
const TAG_CTX_11: u8 = 0x8B;

// BER parsing utilities
pub(crate) struct BerReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> BerReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    fn read_tag(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.cursor
            .read_exact(&mut buf)
            .map_err(|_| framing("truncated: expected tag byte"))?;
        Ok(buf[0])
    }

    fn read_length(&mut self) -> Result<usize> {
        let mut buf = [0u8; 1];
        self.cursor
            .read_exact(&mut buf)
            .map_err(|_| framing("truncated: expected length byte"))?;
        let first_byte = buf[0];

        if (first_byte & 0x80) == 0 {
            // Short form
            Ok(first_byte as usize)
        } else {
            // Long form
            let length_bytes = (first_byte & 0x7F) as usize;
            if length_bytes == 0 {
                return Err(framing("indefinite length not supported"));
            }
            if length_bytes > 4 {
                return Err(framing(format!("length too large: {} bytes", length_bytes)));
            }
            let mut length = 0u32;
            for _ in 0..length_bytes {
                self.cursor
                    .read_exact(&mut buf)
                    .map_err(|_| framing("truncated length encoding"))?;
                length = (length << 8) | buf[0] as u32;
            }
            Ok(length as usize)
        }
    }

    fn read_integer(&mut self) -> Result<i32> {
        let tag = self.read_tag()?;
        if (tag & 0x1F) != 0x02 {
            return Err(framing(format!(
                "expected INTEGER tag (0x02), got: 0x{:02X}",
                tag
            )));
        }
        let length = self.read_length()?;
        if length == 0 || length > 4 {
            return Err(framing(format!("integer of {} bytes", length)));
        }
        let buf = self.read_raw_bytes(length)?;

        let mut value = 0i32;
        for &byte in &buf {
            value = (value << 8) | (byte as i32);
        }

        // Sign extension for negative numbers
        if length < 4 && (buf[0] & 0x80) != 0 {
            value |= !0 << (length * 8);
        }

        Ok(value)
    }

    /// Read OCTET STRING TLV. Accepts 0x04 (universal) or any context-specific
    /// primitive tag 0x80..=0xBF (servers encode response fields implicitly).
    fn read_octet_string(&mut self) -> Result<Vec<u8>> {
        let tag = self.read_tag()?;
        let ok = (tag & 0x1F) == 0x04 || (0x80..=0xBF).contains(&tag);
        if !ok {
            return Err(framing(format!(
                "expected OCTET STRING tag (0x04), got: 0x{:02X}",
                tag
            )));
        }
        self.read_octet_string_value()
    }

    /// Read only length + value of an OCTET STRING (tag already consumed).
    fn read_octet_string_value(&mut self) -> Result<Vec<u8>> {
        let length = self.read_length()?;
        self.read_raw_bytes(length)
    }

    fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_octet_string()?;
        String::from_utf8(bytes).map_err(|_| framing("invalid UTF-8 string"))
    }

    fn read_sequence(&mut self) -> Result<usize> {
        let tag = self.read_tag()?;
        if (tag & 0x1F) != 0x10 {
            return Err(framing(format!("expected SEQUENCE tag, got: 0x{:02X}", tag)));
        }
        self.read_length()
    }

    fn read_enumerated(&mut self) -> Result<i32> {
        let tag = self.read_tag()?;
        if (tag & 0x1F) != 0x0A {
            return Err(framing(format!(
                "expected ENUMERATED tag, got: 0x{:02X}",
                tag
            )));
        }
        let length = self.read_length()?;
        if length == 0 || length > 4 {
            return Err(framing(format!("enumerated of {} bytes", length)));
        }
        let buf = self.read_raw_bytes(length)?;
        let mut value = 0i32;
        for &byte in &buf {
            value = (value << 8) | (byte as i32);
        }
        Ok(value)
    }

    fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len();
        len.saturating_sub(self.position())
    }

    fn read_raw_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        if self.remaining() < n {
            return Err(framing(format!(
                "truncated: need {} bytes, {} remaining",
                n,
                self.remaining()
            )));
        }
        let mut buf = vec![0u8; n];
        self.cursor
            .read_exact(&mut buf)
            .map_err(|_| framing("truncated read"))?;
        Ok(buf)
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        let _ = self.read_raw_bytes(n)?;
        Ok(())
    }
}

// BER encoding utilities
pub struct BerWriter {
    buffer: Vec<u8>,
}

impl Default for BerWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BerWriter {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn write_tag(&mut self, tag: u8) {
        self.buffer.push(tag);
    }

    fn write_length(&mut self, length: usize) {
        if length < 128 {
            // Short form
            self.buffer.push(length as u8);
        } else {
            // Long form
            let mut bytes = Vec::new();
            let mut len = length;
            while len > 0 {
                bytes.push((len & 0xFF) as u8);
                len >>= 8;
            }
            bytes.reverse();
            self.buffer.push(0x80 | bytes.len() as u8);
            self.buffer.extend_from_slice(&bytes);
        }
    }

    pub fn write_integer(&mut self, value: i32) {
        self.write_tag(0x02); // INTEGER tag
        self.write_integer_body(value);
    }

    fn write_integer_body(&mut self, value: i32) {
        let bytes = value.to_be_bytes();
        let start = bytes
            .iter()
            .position(|&b| b != 0 || (value < 0 && b != 0xFF))
            .unwrap_or(3);
        let actual_bytes = &bytes[start..];
        if actual_bytes.is_empty() || (value >= 0 && actual_bytes[0] & 0x80 != 0) {
            // Need sign extension
            self.write_length(actual_bytes.len() + 1);
            if value >= 0 {
                self.buffer.push(0);
            } else {
                self.buffer.push(0xFF);
            }
            self.buffer.extend_from_slice(actual_bytes);
        } else {
            self.write_length(actual_bytes.len());
            self.buffer.extend_from_slice(actual_bytes);
        }
    }

    pub fn write_octet_string(&mut self, data: &[u8]) {
        self.write_tagged_octets(0x04, data);
    }

    /// Write an implicitly tagged octet value (context-specific primitive).
    pub fn write_tagged_octets(&mut self, tag: u8, data: &[u8]) {
        self.write_tag(tag);
        self.write_length(data.len());
        self.buffer.extend_from_slice(data);
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_octet_string(s.as_bytes());
    }

    /// ENUMERATED uses the same minimal two's-complement content encoding as
    /// INTEGER, so wide result codes survive a round trip.
    pub fn write_enumerated(&mut self, value: i32) {
        self.write_tag(0x0A); // ENUMERATED tag
        self.write_integer_body(value);
    }

    /// Reserve a length byte (no tag). Used for [APPLICATION n] IMPLICIT SEQUENCE.
    /// Call patch_implicit_sequence_length(pos) after writing the content.
    pub fn write_length_placeholder(&mut self) -> usize {
        let pos = self.buffer.len();
        self.buffer.push(0);
        pos
    }

    /// Back-patch length at pos for content written after the placeholder.
    /// Supports short and long form.
    pub fn patch_implicit_sequence_length(&mut self, pos: usize) {
        let content_len = self.buffer.len() - (pos + 1);
        if content_len < 128 {
            self.buffer[pos] = content_len as u8;
        } else {
            let mut bytes = Vec::new();
            let mut len = content_len;
            while len > 0 {
                bytes.push((len & 0xFF) as u8);
                len >>= 8;
            }
            bytes.reverse();
            self.buffer[pos] = 0x80 | bytes.len() as u8;
            for (i, b) in bytes.iter().enumerate() {
                self.buffer.insert(pos + 1 + i, *b);
            }
        }
    }

    pub fn start_sequence(&mut self) -> usize {
        self.write_tag(0x30); // SEQUENCE tag
        self.write_length_placeholder()
    }

    pub fn end_sequence(&mut self, start_pos: usize) {
        self.patch_implicit_sequence_length(start_pos);
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }
}

/// Parse only the envelope header (SEQUENCE, messageID, protocolOp tag).
/// Lets a peer pick a response shape before (or without) a full parse.
pub fn parse_message_header(data: &[u8]) -> Result<(i32, u8)> {
    let mut reader = BerReader::new(data);
    let _seq_len = reader.read_sequence()?;
    let message_id = reader.read_integer()?;
    let tag = reader.read_tag()?;
    Ok((message_id, tag))
}

/// Parse one complete LDAP message. `data` must hold exactly one message as
/// delimited by the framer; trailing controls are tolerated and ignored.
pub fn parse_message(data: &[u8]) -> Result<LdapMessage> {
    let mut reader = BerReader::new(data);

    // LDAPMessage ::= SEQUENCE { messageID, protocolOp, controls [0] OPTIONAL }
    let _seq_len = reader.read_sequence()?;

    let message_id = reader.read_integer()?;

    let tag = reader.read_tag()?;
    let protocol_op = match tag {
        LDAP_TAG_BIND_REQUEST => ProtocolOp::BindRequest(parse_bind_request(&mut reader)?),
        LDAP_TAG_BIND_RESPONSE => ProtocolOp::BindResponse(parse_bind_response(&mut reader)?),
        LDAP_TAG_UNBIND_REQUEST => {
            let _len = reader.read_length()?;
            ProtocolOp::UnbindRequest
        }
        LDAP_TAG_EXTENDED_REQUEST => {
            ProtocolOp::ExtendedRequest(parse_extended_request(&mut reader)?)
        }
        LDAP_TAG_EXTENDED_RESPONSE => {
            ProtocolOp::ExtendedResponse(parse_extended_response(&mut reader)?)
        }
        _ => {
            return Err(framing(format!(
                "unsupported LDAP operation tag: 0x{:02X}",
                tag
            )))
        }
    };

    Ok(LdapMessage {
        message_id,
        protocol_op,
    })
}

fn parse_bind_request(reader: &mut BerReader) -> Result<BindRequest> {
    let len = reader.read_length()?;
    let end = reader.position() + len;
    let version = reader.read_integer()?;
    let name = reader.read_string()?;

    let auth_tag = reader.read_tag()?;
    let authentication = if auth_tag == TAG_CTX_3_CONSTRUCTED {
        // SaslCredentials ::= SEQUENCE { mechanism, credentials OPTIONAL }
        let sasl_len = reader.read_length()?;
        let sasl_end = reader.position() + sasl_len;
        let mechanism = reader.read_string()?;
        let credentials = if reader.position() < sasl_end {
            reader.read_octet_string()?
        } else {
            Vec::new()
        };
        BindAuthentication::Sasl {
            mechanism,
            credentials,
        }
    } else {
        // simple [0] IMPLICIT OCTET STRING; tag already consumed
        let password = reader.read_octet_string_value()?;
        BindAuthentication::Simple(
            String::from_utf8(password).map_err(|_| framing("invalid UTF-8 password"))?,
        )
    };
    if reader.position() > end {
        return Err(framing("bind request overruns its length"));
    }

    Ok(BindRequest {
        version,
        name,
        authentication,
    })
}

fn parse_bind_response(reader: &mut BerReader) -> Result<BindResponse> {
    let len = reader.read_length()?;
    let end = reader.position() + len;
    let result_code = reader.read_enumerated()?;
    let matched_dn = reader.read_string()?;
    let diagnostic_message = reader.read_string()?;

    let mut server_sasl_creds = None;
    while reader.position() < end {
        let tag = reader.read_tag()?;
        match tag {
            TAG_CTX_7 => server_sasl_creds = Some(reader.read_octet_string_value()?),
            // referral [3] or anything else we don't surface: skip its TLV
            _ => {
                let skip_len = reader.read_length()?;
                reader.skip(skip_len)?;
            }
        }
    }

    Ok(BindResponse {
        result_code,
        matched_dn,
        diagnostic_message,
        server_sasl_creds,
    })
}

fn parse_extended_request(reader: &mut BerReader) -> Result<ExtendedRequest> {
    let len = reader.read_length()?;
    let end = reader.position() + len;
    let request_name = reader.read_string()?;
    let request_value = if reader.position() < end {
        Some(reader.read_octet_string()?)
    } else {
        None
    };
    Ok(ExtendedRequest {
        request_name,
        request_value,
    })
}

fn parse_extended_response(reader: &mut BerReader) -> Result<ExtendedResponse> {
    let len = reader.read_length()?;
    let end = reader.position() + len;
    let result_code = reader.read_enumerated()?;
    let matched_dn = reader.read_string()?;
    let diagnostic_message = reader.read_string()?;

    let mut response_name = None;
    let mut response_value = None;
    while reader.position() < end {
        let tag = reader.read_tag()?;
        match tag {
            TAG_CTX_10 => {
                let bytes = reader.read_octet_string_value()?;
                response_name =
                    Some(String::from_utf8(bytes).map_err(|_| framing("invalid UTF-8 OID"))?);
            }
            TAG_CTX_11 => response_value = Some(reader.read_octet_string_value()?),
            _ => {
                let skip_len = reader.read_length()?;
                reader.skip(skip_len)?;
            }
        }
    }

    Ok(ExtendedResponse {
        result_code,
        matched_dn,
        diagnostic_message,
        response_name,
        response_value,
    })
}

pub fn encode_message(message: &LdapMessage) -> Result<Vec<u8>> {
    let mut writer = BerWriter::new();
    let seq_start = writer.start_sequence();

    writer.write_integer(message.message_id);

    match &message.protocol_op {
        ProtocolOp::BindRequest(req) => encode_bind_request(&mut writer, req),
        ProtocolOp::BindResponse(resp) => encode_bind_response(&mut writer, resp),
        ProtocolOp::UnbindRequest => {
            // UnbindRequest ::= [APPLICATION 2] NULL
            writer.write_tag(LDAP_TAG_UNBIND_REQUEST);
            writer.write_length(0);
        }
        ProtocolOp::ExtendedRequest(req) => encode_extended_request(&mut writer, req),
        ProtocolOp::ExtendedResponse(resp) => encode_extended_response(&mut writer, resp),
    }

    writer.end_sequence(seq_start);
    Ok(writer.into_vec())
}

fn encode_bind_request(writer: &mut BerWriter, req: &BindRequest) {
    writer.write_tag(LDAP_TAG_BIND_REQUEST);
    let len_pos = writer.write_length_placeholder();
    writer.write_integer(req.version);
    writer.write_string(&req.name);
    match &req.authentication {
        BindAuthentication::Simple(password) => {
            writer.write_tagged_octets(TAG_CTX_0, password.as_bytes());
        }
        BindAuthentication::Sasl {
            mechanism,
            credentials,
        } => {
            writer.write_tag(TAG_CTX_3_CONSTRUCTED);
            let sasl_pos = writer.write_length_placeholder();
            writer.write_string(mechanism);
            writer.write_octet_string(credentials);
            writer.patch_implicit_sequence_length(sasl_pos);
        }
    }
    writer.patch_implicit_sequence_length(len_pos);
}

fn encode_bind_response(writer: &mut BerWriter, resp: &BindResponse) {
    writer.write_tag(LDAP_TAG_BIND_RESPONSE);
    let len_pos = writer.write_length_placeholder();
    writer.write_enumerated(resp.result_code);
    writer.write_string(&resp.matched_dn);
    writer.write_string(&resp.diagnostic_message);
    if let Some(ref creds) = resp.server_sasl_creds {
        writer.write_tagged_octets(TAG_CTX_7, creds);
    }
    writer.patch_implicit_sequence_length(len_pos);
}

fn encode_extended_request(writer: &mut BerWriter, req: &ExtendedRequest) {
    writer.write_tag(LDAP_TAG_EXTENDED_REQUEST);
    let len_pos = writer.write_length_placeholder();
    writer.write_tagged_octets(TAG_CTX_0, req.request_name.as_bytes());
    if let Some(ref value) = req.request_value {
        writer.write_tagged_octets(TAG_CTX_1, value);
    }
    writer.patch_implicit_sequence_length(len_pos);
}

fn encode_extended_response(writer: &mut BerWriter, resp: &ExtendedResponse) {
    writer.write_tag(LDAP_TAG_EXTENDED_RESPONSE);
    let len_pos = writer.write_length_placeholder();
    writer.write_enumerated(resp.result_code);
    writer.write_string(&resp.matched_dn);
    writer.write_string(&resp.diagnostic_message);
    if let Some(ref name) = resp.response_name {
        writer.write_tagged_octets(TAG_CTX_10, name.as_bytes());
    }
    if let Some(ref value) = resp.response_value {
        writer.write_tagged_octets(TAG_CTX_11, value);
    }
    writer.patch_implicit_sequence_length(len_pos);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ber_writer_integer() {
        let mut writer = BerWriter::new();
        writer.write_integer(42);
        assert_eq!(writer.into_vec(), vec![0x02, 0x01, 0x2A]);

        let mut writer = BerWriter::new();
        writer.write_integer(256);
        assert_eq!(writer.into_vec(), vec![0x02, 0x02, 0x01, 0x00]);

        // 128 needs a leading zero so it is not read as negative
        let mut writer = BerWriter::new();
        writer.write_integer(128);
        assert_eq!(writer.into_vec(), vec![0x02, 0x02, 0x00, 0x80]);
    }

    #[test]
    fn ber_reader_integer() {
        let data = vec![0x02, 0x01, 0x2A];
        let mut reader = BerReader::new(&data);
        assert_eq!(reader.read_integer().unwrap(), 42);

        let data = vec![0x02, 0x01, 0xFF];
        let mut reader = BerReader::new(&data);
        assert_eq!(reader.read_integer().unwrap(), -1);
    }

    #[test]
    fn ber_writer_long_length() {
        let mut writer = BerWriter::new();
        let seq_start = writer.start_sequence();
        for _ in 0..200 {
            writer.write_string("test");
        }
        writer.end_sequence(seq_start);
        let result = writer.into_vec();
        assert_eq!(result[0], 0x30);
        // Long-form length marker
        assert!(result[1] & 0x80 != 0);
    }

    #[test]
    fn encode_starttls_request_bytes() {
        let msg = LdapMessage {
            message_id: 1,
            protocol_op: start_tls_request(),
        };
        let encoded = encode_message(&msg).unwrap();
        // SEQUENCE { INTEGER 1, [APPLICATION 23] { [0] OID } }
        let oid = START_TLS_OID.as_bytes();
        let mut expected = vec![0x30, (3 + 2 + oid.len()) as u8];
        expected.extend_from_slice(&[0x02, 0x01, 0x01]);
        expected.extend_from_slice(&[LDAP_TAG_EXTENDED_REQUEST, (2 + oid.len()) as u8]);
        expected.extend_from_slice(&[0x80, oid.len() as u8]);
        expected.extend_from_slice(oid);
        assert_eq!(encoded, expected);
    }

    #[test]
    fn bind_request_sasl_roundtrip() {
        let msg = LdapMessage {
            message_id: 5,
            protocol_op: ProtocolOp::BindRequest(BindRequest {
                version: 3,
                name: String::new(),
                authentication: BindAuthentication::Sasl {
                    mechanism: "GSSAPI".to_string(),
                    credentials: vec![0x01, 0x02, 0x03],
                },
            }),
        };
        let encoded = encode_message(&msg).unwrap();
        assert_eq!(encoded[0], 0x30);
        let parsed = parse_message(&encoded).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn bind_request_simple_roundtrip() {
        let msg = LdapMessage {
            message_id: 2,
            protocol_op: ProtocolOp::BindRequest(BindRequest {
                version: 3,
                name: "cn=admin,dc=example,dc=com".to_string(),
                authentication: BindAuthentication::Simple("secret".to_string()),
            }),
        };
        let encoded = encode_message(&msg).unwrap();
        let parsed = parse_message(&encoded).unwrap();
        assert_eq!(parsed, msg);
    }

    /// BindResponse with serverSaslCreds [7], hand-assembled the way a server
    /// would encode a saslBindInProgress reply.
    #[test]
    fn parse_bind_response_with_sasl_creds() {
        let msg = vec![
            0x30, 0x10, // SEQUENCE length 16
            0x02, 0x01, 0x02, // messageID 2
            0x61, 0x0B, // BindResponse length 11
            0x0A, 0x01, 0x0E, // ENUMERATED 14 (saslBindInProgress)
            0x04, 0x00, // matchedDN ""
            0x04, 0x00, // diagnosticMessage ""
            0x87, 0x02, 0xAB, 0xCD, // serverSaslCreds [7]
        ];
        let parsed = parse_message(&msg).unwrap();
        assert_eq!(parsed.message_id, 2);
        match parsed.protocol_op {
            ProtocolOp::BindResponse(resp) => {
                assert_eq!(resp.result_code, RESULT_SASL_BIND_IN_PROGRESS);
                assert_eq!(resp.server_sasl_creds, Some(vec![0xAB, 0xCD]));
            }
            other => panic!("expected BindResponse, got {:?}", other),
        }
    }

    #[test]
    fn parse_extended_response_with_value() {
        let resp = ExtendedResponse {
            result_code: 0,
            matched_dn: String::new(),
            diagnostic_message: String::new(),
            response_name: Some(WHOAMI_OID.to_string()),
            response_value: Some(b"dn:cn=test".to_vec()),
        };
        let msg = LdapMessage {
            message_id: 7,
            protocol_op: ProtocolOp::ExtendedResponse(resp.clone()),
        };
        let encoded = encode_message(&msg).unwrap();
        let parsed = parse_message(&encoded).unwrap();
        match parsed.protocol_op {
            ProtocolOp::ExtendedResponse(got) => assert_eq!(got, resp),
            other => panic!("expected ExtendedResponse, got {:?}", other),
        }
    }

    #[test]
    fn wide_result_codes_survive_roundtrip() {
        let mut writer = BerWriter::new();
        writer.write_enumerated(4096);
        let bytes = writer.into_vec();
        assert_eq!(bytes, vec![0x0A, 0x02, 0x10, 0x00]);
        let mut reader = BerReader::new(&bytes);
        assert_eq!(reader.read_enumerated().unwrap(), 4096);

        let msg = LdapMessage {
            message_id: 1,
            protocol_op: ProtocolOp::ExtendedResponse(ExtendedResponse {
                result_code: 4096,
                matched_dn: String::new(),
                diagnostic_message: String::new(),
                response_name: None,
                response_value: None,
            }),
        };
        let parsed = parse_message(&encode_message(&msg).unwrap()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn unbind_roundtrip() {
        let msg = LdapMessage {
            message_id: 9,
            protocol_op: ProtocolOp::UnbindRequest,
        };
        let encoded = encode_message(&msg).unwrap();
        assert_eq!(encoded, vec![0x30, 0x05, 0x02, 0x01, 0x09, 0x42, 0x00]);
        assert_eq!(parse_message(&encoded).unwrap(), msg);
    }

    #[test]
    fn parse_message_header_reads_id_and_tag() {
        let msg = LdapMessage {
            message_id: 42,
            protocol_op: whoami_request(),
        };
        let encoded = encode_message(&msg).unwrap();
        let (id, tag) = parse_message_header(&encoded).unwrap();
        assert_eq!(id, 42);
        assert_eq!(tag, LDAP_TAG_EXTENDED_REQUEST);
    }

    #[test]
    fn unknown_operation_tag_is_framing_error() {
        // SEQUENCE { INTEGER 1, [APPLICATION 3] ... } holds a SearchRequest tag we
        // do not implement.
        let msg = vec![0x30, 0x05, 0x02, 0x01, 0x01, 0x63, 0x00];
        match parse_message(&msg) {
            Err(LdapError::Framing(_)) => {}
            other => panic!("expected framing error, got {:?}", other),
        }
    }

    #[test]
    fn truncated_message_is_framing_error() {
        let msg = vec![0x30, 0x20, 0x02, 0x01];
        assert!(matches!(parse_message(&msg), Err(LdapError::Framing(_))));
    }
}
