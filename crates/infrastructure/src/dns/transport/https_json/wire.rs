//! Field-level helpers for turning presentation-format `data` strings into
//! rdata.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDateTime;
use data_encoding::BASE32_DNSSEC;
use hickory_proto::rr::{Name, RecordType};
use std::str::FromStr;

/// Longest character-string a TXT-like record can carry.
pub const MAX_CHARACTER_STRING: usize = 255;

const SIG_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Fields of a JSON `data` string, split on ASCII whitespace.
pub fn fields(data: &str) -> Vec<&str> {
    data.split_ascii_whitespace().collect()
}

/// Character-strings of a TXT-like `data` value.
///
/// Quoted strings are taken as-is with `\"` and `\\` unescaped; unquoted text
/// yields one string per field.
pub fn character_strings(data: &str) -> Vec<String> {
    let data = data.trim();
    if !data.starts_with('"') {
        return fields(data).into_iter().map(str::to_string).collect();
    }

    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = data.chars();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', false) => in_quotes = true,
            ('"', true) => {
                strings.push(std::mem::take(&mut current));
                in_quotes = false;
            }
            ('\\', true) => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            (c, true) => current.push(c),
            _ => {}
        }
    }
    if in_quotes && !current.is_empty() {
        strings.push(current);
    }

    strings
}

/// Character-strings that all fit the one-octet length prefix, or `None`.
pub fn bounded_character_strings(data: &str) -> Option<Vec<String>> {
    let strings = character_strings(data);
    strings
        .iter()
        .all(|s| s.len() <= MAX_CHARACTER_STRING)
        .then_some(strings)
}

pub fn parse_name(text: &str) -> Option<Name> {
    let mut name = Name::from_ascii(text).ok()?;
    name.set_fqdn(true);
    Some(name)
}

/// Uncompressed wire form of `name`, for rdata hickory keeps opaque.
pub fn push_name(buf: &mut Vec<u8>, name: &Name) {
    for label in name.iter() {
        buf.push(label.len() as u8);
        buf.extend_from_slice(label);
    }
    buf.push(0);
}

pub fn push_character_string(buf: &mut Vec<u8>, text: &str) -> Option<()> {
    let bytes = text.as_bytes();
    buf.push(u8::try_from(bytes.len()).ok()?);
    buf.extend_from_slice(bytes);
    Some(())
}

/// Record type for a mnemonic such as `AAAA` or `TYPE65534`.
pub fn record_type(mnemonic: &str) -> Option<RecordType> {
    let upper = mnemonic.to_ascii_uppercase();
    if let Some(code) = upper.strip_prefix("TYPE") {
        return code.parse::<u16>().ok().map(RecordType::from);
    }
    match RecordType::from_str(&upper).ok()? {
        RecordType::Unknown(_) => None,
        known => Some(known),
    }
}

/// Known mnemonics among `tokens`; unrecognised ones are ignored.
pub fn record_types(tokens: &[&str]) -> Vec<RecordType> {
    tokens.iter().filter_map(|token| record_type(token)).collect()
}

pub fn decode_hex(text: &str) -> Option<Vec<u8>> {
    hex::decode(text).ok()
}

/// NSEC3 salt: `-` for none, otherwise hex.
pub fn decode_salt(text: &str) -> Option<Vec<u8>> {
    if text == "-" {
        Some(Vec::new())
    } else {
        decode_hex(text)
    }
}

pub fn decode_base64(text: &str) -> Option<Vec<u8>> {
    STANDARD.decode(text).ok()
}

/// NSEC3 next hashed owner name: unpadded base32hex, either case.
pub fn decode_base32hex(text: &str) -> Option<Vec<u8>> {
    BASE32_DNSSEC.decode(text.as_bytes()).ok()
}

/// RRSIG timestamps: `YYYYMMDDHHmmSS` (UTC) or plain seconds since the epoch.
pub fn parse_sig_time(text: &str) -> Option<u32> {
    if text.len() == 14 {
        let at = NaiveDateTime::parse_from_str(text, SIG_TIME_FORMAT).ok()?;
        return u32::try_from(at.and_utc().timestamp()).ok();
    }
    text.parse().ok()
}
