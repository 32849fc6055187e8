//! Compact JWS serialization as carried by a health card.
//!
//! The payload segment is raw-deflated JSON, and the signature covers the
//! header and payload segments exactly as they were transmitted.

use std::io::Read;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use flate2::read::DeflateDecoder;
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result, Segment};

/// URL-safe alphabet; padding optional, non-canonical trailing bits accepted.
pub(crate) const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

const SIGNATURE_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Compression marker, `DEF` for raw deflate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    pub kid: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A card split into its parts, not yet verified.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedJws {
    /// `header.payload`, still base64url encoded. This is what is signed.
    pub signed_document: String,
    pub header: Header,
    pub payload: Value,
    /// Signature segment, still base64url encoded.
    pub signature: String,
}

impl DecodedJws {
    pub fn kid(&self) -> &str {
        &self.header.kid
    }

    pub fn issuer(&self) -> Option<&str> {
        self.payload.get("iss").and_then(Value::as_str)
    }
}

/// The two big-endian 32 byte integers of an ES256 signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl Signature {
    pub fn decode(signature: &str) -> Result<Self> {
        let raw = BASE64URL
            .decode(signature)
            .map_err(|e| Error::decode(Segment::Signature, e))?;
        if raw.len() != SIGNATURE_LEN {
            return Err(Error::SignatureFormat { len: raw.len() });
        }

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&raw[..32]);
        s.copy_from_slice(&raw[32..]);
        Ok(Signature { r, s })
    }
}

pub fn split(compact: &str) -> Result<DecodedJws> {
    let segments: Vec<&str> = compact.split('.').collect();
    let (header_b64, payload_b64, signature) = match segments.as_slice() {
        [header, payload, signature] => (*header, *payload, *signature),
        _ => {
            return Err(Error::SegmentCount {
                found: segments.len(),
            })
        }
    };

    let header_raw = BASE64URL
        .decode(header_b64)
        .map_err(|e| Error::decode(Segment::Header, e))?;
    let header_json = decode_text(Segment::Header, header_raw)?;
    let header: Header =
        serde_json::from_str(&header_json).map_err(|e| Error::decode(Segment::Header, e))?;
    debug!(kid = %header.kid, zip = ?header.zip, "decoded header");

    let compressed = BASE64URL
        .decode(payload_b64)
        .map_err(|e| Error::decode(Segment::Payload, e))?;
    let mut inflater = DeflateDecoder::new(compressed.as_slice());
    let mut payload_raw = Vec::new();
    inflater
        .read_to_end(&mut payload_raw)
        .map_err(|e| Error::decode(Segment::Payload, e))?;
    let payload_json = decode_text(Segment::Payload, payload_raw)?;
    let payload: Value =
        serde_json::from_str(&payload_json).map_err(|e| Error::decode(Segment::Payload, e))?;
    debug!(
        compressed = compressed.len(),
        inflated = payload_json.len(),
        "decoded payload"
    );

    Ok(DecodedJws {
        signed_document: format!("{}.{}", header_b64, payload_b64),
        header,
        payload,
        signature: signature.to_string(),
    })
}

fn decode_text(segment: Segment, raw: Vec<u8>) -> Result<String> {
    String::from_utf8(raw).map_err(|e| Error::decode(segment, e))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::DeflateEncoder;
    use flate2::Compression;

    use super::*;
    use crate::error::DecodeFailure;

    fn b64(data: &[u8]) -> String {
        BASE64URL.encode(data)
    }

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn compact(header: &str, payload: &str, signature: &[u8]) -> String {
        format!(
            "{}.{}.{}",
            b64(header.as_bytes()),
            b64(&deflate(payload.as_bytes())),
            b64(signature)
        )
    }

    const HEADER: &str = r#"{"zip":"DEF","alg":"ES256","kid":"key-1"}"#;
    const PAYLOAD: &str = r#"{"iss":"https://example.org/issuer","nbf":1628099964.297}"#;

    #[test]
    fn split_test() {
        let token = compact(HEADER, PAYLOAD, &[7u8; 64]);
        let jws = split(&token).unwrap();

        assert_eq!(jws.kid(), "key-1");
        assert_eq!(jws.header.alg.as_deref(), Some("ES256"));
        assert_eq!(jws.header.zip.as_deref(), Some("DEF"));
        assert!(jws.header.extra.is_empty());
        assert_eq!(jws.issuer(), Some("https://example.org/issuer"));
        assert_eq!(jws.payload["nbf"], 1628099964.297);

        let dot = token.rfind('.').unwrap();
        assert_eq!(jws.signed_document, token[..dot]);
        assert_eq!(jws.signature, token[dot + 1..]);
        assert_eq!(BASE64URL.decode(&jws.signature).unwrap().len(), 64);
    }

    #[test]
    fn split_keeps_unknown_header_fields() {
        let header = r#"{"alg":"ES256","kid":"key-1","typ":"JWT"}"#;
        let jws = split(&compact(header, PAYLOAD, &[1u8; 64])).unwrap();
        assert_eq!(jws.header.zip, None);
        assert_eq!(jws.header.extra["typ"], "JWT");
    }

    #[test]
    fn split_wrong_segment_count() {
        match split("a.b") {
            Err(Error::SegmentCount { found: 2 }) => {}
            other => panic!("unexpected {:?}", other),
        }
        match split("a.b.c.d") {
            Err(Error::SegmentCount { found: 4 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn split_header_without_kid() {
        let token = compact(r#"{"alg":"ES256"}"#, PAYLOAD, &[1u8; 64]);
        match split(&token) {
            Err(Error::Decode {
                segment: Segment::Header,
                source: DecodeFailure::Json(_),
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn split_header_bad_base64() {
        let token = format!("not*base64.{}.AA", b64(&deflate(PAYLOAD.as_bytes())));
        match split(&token) {
            Err(Error::Decode {
                segment: Segment::Header,
                source: DecodeFailure::Base64(_),
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn split_header_not_utf8() {
        let token = format!("{}.{}.AA", b64(&[0xff, 0xfe]), b64(&deflate(b"{}")));
        match split(&token) {
            Err(Error::Decode {
                segment: Segment::Header,
                source: DecodeFailure::Utf8(_),
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn split_payload_bad_base64() {
        let token = format!("{}.not*base64.AA", b64(HEADER.as_bytes()));
        match split(&token) {
            Err(Error::Decode {
                segment: Segment::Payload,
                source: DecodeFailure::Base64(_),
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn split_payload_not_deflated() {
        // block type 3 is reserved
        let token = format!("{}.{}.AA", b64(HEADER.as_bytes()), b64(&[0xff, 0xff, 0xff]));
        match split(&token) {
            Err(Error::Decode {
                segment: Segment::Payload,
                source: DecodeFailure::Inflate(_),
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn split_payload_bad_json() {
        let token = compact(HEADER, "{\"iss\":", &[1u8; 64]);
        match split(&token) {
            Err(Error::Decode {
                segment: Segment::Payload,
                source: DecodeFailure::Json(_),
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn signature_decode_test() {
        let mut raw = [0u8; 64];
        raw[0] = 1;
        raw[63] = 2;
        let sig = Signature::decode(&b64(&raw)).unwrap();
        assert_eq!(sig.r[0], 1);
        assert_eq!(sig.r[31], 0);
        assert_eq!(sig.s[0], 0);
        assert_eq!(sig.s[31], 2);

        let padded = format!("{}==", b64(&raw));
        assert_eq!(Signature::decode(&padded).unwrap(), sig);
    }

    #[test]
    fn signature_wrong_length() {
        match Signature::decode(&b64(&[0u8; 63])) {
            Err(Error::SignatureFormat { len: 63 }) => {}
            other => panic!("unexpected {:?}", other),
        }
        match Signature::decode(&b64(&[0u8; 72])) {
            Err(Error::SignatureFormat { len: 72 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn signature_bad_base64() {
        match Signature::decode("@@@@") {
            Err(Error::Decode {
                segment: Segment::Signature,
                ..
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
