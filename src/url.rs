use crate::{Error, Result};

/// Returns the raw query string of `url` (without `?` and without fragment).
pub(crate) fn query_string(url: &str) -> &str {
    let without_fragment = url.split_once('#').map(|(head, _)| head).unwrap_or(url);
    without_fragment
        .split_once('?')
        .map(|(_, query)| query)
        .unwrap_or("")
}

pub(crate) fn parse_query_pairs(query: &str) -> Result<Vec<(String, String)>> {
    let query = query.strip_prefix('?').unwrap_or(query);
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let mut pairs = Vec::new();
    for part in query.split('&') {
        if part.is_empty() {
            continue;
        }
        let (raw_name, raw_value) = part.split_once('=').unwrap_or((part, ""));
        let name = decode_form_urlencoded_component(raw_name)?;
        let value = decode_form_urlencoded_component(raw_value)?;
        pairs.push((name, value));
    }
    Ok(pairs)
}

/// First decoded value of `name` in the query string of `url`.
pub(crate) fn query_param(url: &str, name: &str) -> Result<Option<String>> {
    Ok(parse_query_pairs(query_string(url))?
        .into_iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value))
}

pub(crate) fn decode_form_urlencoded_component(src: &str) -> Result<String> {
    let bytes = src.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                let hi = bytes.get(i + 1).copied().and_then(from_hex_digit);
                let lo = bytes.get(i + 2).copied().and_then(from_hex_digit);
                let (Some(hi), Some(lo)) = (hi, lo) else {
                    return Err(Error::Url(format!("malformed percent-encoding in {src:?}")));
                };
                out.push((hi << 4) | lo);
                i += 3;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| Error::Url(format!("malformed UTF-8 sequence in {src:?}")))
}

pub(crate) fn encode_form_urlencoded_component(src: &str) -> String {
    let mut out = String::new();
    for b in src.as_bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'*' | b'-' | b'.' | b'_') {
            out.push(*b as char);
        } else if *b == b' ' {
            out.push('+');
        } else {
            out.push('%');
            out.push(to_hex_upper((*b >> 4) & 0x0F));
            out.push(to_hex_upper(*b & 0x0F));
        }
    }
    out
}

fn from_hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn to_hex_upper(nibble: u8) -> char {
    match nibble {
        0..=9 => (b'0' + nibble) as char,
        _ => (b'A' + (nibble - 10)) as char,
    }
}
