//! Numeric QR mode encoding used by SMART Health Card QR codes.
//!
//! Every character of the compact serialization is written as two decimal
//! digits holding its code point minus 45, so the whole token fits the
//! dense numeric mode of a QR code.

use std::collections::BTreeSet;

use crate::error::{Error, Result};

pub const SHC_PREFIX: &str = "shc:/";

const OFFSET: u8 = 45;

/// Removes the `shc:/` scheme marker and any trailing whitespace left by the
/// scanner. Input without the marker is returned unchanged.
pub fn strip_prefix(data: &str) -> &str {
    let data = data.trim_end();
    data.strip_prefix(SHC_PREFIX).unwrap_or(data)
}

/// Transcodes the digit string into the compact serialization.
///
/// The input is checked as a whole before anything is decoded: every
/// non-digit character is reported, together with the input length.
pub fn to_compact(digits: &str) -> Result<String> {
    let invalid_chars: BTreeSet<char> = digits.chars().filter(|c| !c.is_ascii_digit()).collect();
    let len = digits.chars().count();
    if !invalid_chars.is_empty() || len % 2 != 0 {
        return Err(Error::InputFormat { invalid_chars, len });
    }

    let compact = digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let value = (pair[0] - b'0') * 10 + (pair[1] - b'0');
            char::from(value + OFFSET)
        })
        .collect();
    Ok(compact)
}

#[test]
fn to_compact_test() {
    assert_eq!(to_compact("43").unwrap(), "X");
    assert_eq!(to_compact("4343").unwrap(), "XX");
    assert_eq!(to_compact("").unwrap(), "");
    // '.' is 46, '-' is 45 and '_' is 95
    assert_eq!(to_compact("010050").unwrap(), ".-_");
}

#[test]
fn to_compact_rejects_non_digits() {
    for input in &["abc", "123#", "A123", "--12", "123 "] {
        match to_compact(input) {
            Err(Error::InputFormat { invalid_chars, len }) => {
                assert!(!invalid_chars.is_empty(), "{}", input);
                assert_eq!(len, input.len());
            }
            other => panic!("{:?} accepted: {:?}", input, other),
        }
    }
}

#[test]
fn to_compact_reports_all_invalid_chars() {
    match to_compact("1a2b3a") {
        Err(Error::InputFormat { invalid_chars, len }) => {
            assert_eq!(invalid_chars.into_iter().collect::<String>(), "ab");
            assert_eq!(len, 6);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn to_compact_rejects_odd_length() {
    for input in &["1", "123", "43434"] {
        match to_compact(input) {
            Err(Error::InputFormat { invalid_chars, len }) => {
                assert!(invalid_chars.is_empty());
                assert_eq!(len, input.len());
            }
            other => panic!("{:?} accepted: {:?}", input, other),
        }
    }
}

#[test]
fn strip_prefix_test() {
    assert_eq!(strip_prefix("shc:/5676\n"), "5676");
    assert_eq!(strip_prefix("5676"), "5676");
    assert_eq!(strip_prefix("SHC:/5676"), "SHC:/5676");
}
