use std::collections::BTreeSet;
use std::fmt;

/// Segment of the compact serialization a decode error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Header,
    Payload,
    Signature,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Segment::Header => "header",
            Segment::Payload => "payload",
            Segment::Signature => "signature",
        };
        f.write_str(name)
    }
}

/// What went wrong while decoding a single segment.
#[derive(Debug, thiserror::Error)]
pub enum DecodeFailure {
    #[error("malformed base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("raw inflate failed: {0}")]
    Inflate(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The scanned string is not an even-length run of decimal digits.
    #[error("{}", input_format_message(.invalid_chars, .len))]
    InputFormat {
        invalid_chars: BTreeSet<char>,
        len: usize,
    },

    #[error("expected 3 dot-separated segments, found {found}")]
    SegmentCount { found: usize },

    #[error("cannot decode {segment} segment: {source}")]
    Decode {
        segment: Segment,
        #[source]
        source: DecodeFailure,
    },

    #[error("payload has no string `iss` claim")]
    MissingIssuer,

    #[error("cannot build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("cannot fetch key set from {url}: {message}")]
    KeyFetch { url: String, message: String },

    /// No ES256 verification key with this id in the issuer's key set.
    #[error("no public key with key id '{kid}' found")]
    KeyNotFound { kid: String },

    #[error("key '{kid}' is malformed: {message}")]
    KeyFormat { kid: String, message: String },

    #[error("signature must be 64 bytes, got {len}")]
    SignatureFormat { len: usize },
}

impl Error {
    pub(crate) fn decode(segment: Segment, source: impl Into<DecodeFailure>) -> Self {
        Error::Decode {
            segment,
            source: source.into(),
        }
    }
}

fn input_format_message(invalid_chars: &BTreeSet<char>, len: &usize) -> String {
    if invalid_chars.is_empty() {
        format!("odd number of characters ({}) in input", len)
    } else {
        format!(
            "invalid characters found (non-numeric) in input of length {}: {:?}",
            len, invalid_chars
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[test]
fn input_format_message_lists_every_offender() {
    let err = Error::InputFormat {
        invalid_chars: "#A ".chars().collect(),
        len: 7,
    };
    assert_eq!(
        err.to_string(),
        "invalid characters found (non-numeric) in input of length 7: {' ', '#', 'A'}"
    );
}

#[test]
fn decode_error_names_segment() {
    let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err = Error::decode(Segment::Payload, source);
    assert!(err.to_string().starts_with("cannot decode payload segment: invalid JSON"));
}
