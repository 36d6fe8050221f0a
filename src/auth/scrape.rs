//! Best-effort extraction from the Cloud SDK's local databases
//!
//! The SDK keeps its tokens and credentials in SQLite files. Rather than
//! depend on that schema, these functions scan the raw bytes for known
//! markers and pick out the adjacent values. Rows that SQLite has freed but
//! not yet overwritten can still match, so callers must validate what they
//! get (expiry in the future, refresh accepted by the server).
//!
//! Everything here is a pure function over `&[u8]`.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

use super::token::{AccessToken, CredentialRecord};

/// Prefix of the provider's OAuth2 access tokens
pub const ACCESS_TOKEN_MARKER: &[u8] = b"ya29.";

/// How far past the end of a token its expiry timestamp may start
pub const TIMESTAMP_WINDOW: usize = 64;

/// How far past a quoted key its string value may start
pub const VALUE_WINDOW: usize = 16;

const CLIENT_ID_KEY: &[u8] = b"\"client_id\"";
const CLIENT_SECRET_KEY: &[u8] = b"\"client_secret\"";
const REFRESH_TOKEN_KEY: &[u8] = b"\"refresh_token\"";

/// `YYYY-MM-DD HH:MM:SS`, the shortest timestamp we accept
const TIMESTAMP_LEN: usize = 19;

/// All access tokens found in `data`, each paired with its adjacent expiry
pub fn access_token_candidates(data: &[u8]) -> Vec<AccessToken> {
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(start) = find(data, ACCESS_TOKEN_MARKER, pos) {
        let body_start = start + ACCESS_TOKEN_MARKER.len();
        let mut end = body_start;
        // stop at the first non-token byte, or where the expiry begins when
        // the two columns are stored back to back
        while end < data.len() && is_token_byte(data[end]) && timestamp_at(data, end).is_none() {
            end += 1;
        }
        pos = end.max(start + 1);

        if end == body_start {
            continue;
        }

        let window_end = (end + TIMESTAMP_WINDOW).min(data.len());
        let expiry = (end..window_end).find_map(|i| timestamp_at(data, i));

        if let (Some(expiry), Ok(value)) = (expiry, std::str::from_utf8(&data[start..end])) {
            found.push(AccessToken::new(value, expiry));
        }
    }

    found
}

/// The candidate with the latest expiry, whether or not it is still valid
pub fn extract_access_token(data: &[u8]) -> Option<AccessToken> {
    access_token_candidates(data)
        .into_iter()
        .max_by_key(|t| t.expires_at)
}

/// First complete `{client_id, client_secret, refresh_token}` record in `data`
///
/// Each `"client_id"` key starts a region that runs to the next one; the
/// other two fields must be found inside the same region.
pub fn extract_credential_record(data: &[u8]) -> Option<CredentialRecord> {
    let mut pos = 0;

    while let Some(start) = find(data, CLIENT_ID_KEY, pos) {
        let region_end = find(data, CLIENT_ID_KEY, start + 1).unwrap_or(data.len());
        let region = &data[start..region_end];
        pos = start + 1;

        let record = (|| {
            Some(CredentialRecord {
                client_id: field_value(region, CLIENT_ID_KEY)?,
                client_secret: field_value(region, CLIENT_SECRET_KEY)?,
                refresh_token: field_value(region, REFRESH_TOKEN_KEY)?,
            })
        })();

        if record.is_some() {
            return record;
        }
    }

    None
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-')
}

/// Parse `YYYY-MM-DD[ T]HH:MM:SS[.fraction]` starting at `at`, read as UTC
fn timestamp_at(data: &[u8], at: usize) -> Option<DateTime<Utc>> {
    let head = data.get(at..at + TIMESTAMP_LEN)?;

    let shape_ok = head.iter().enumerate().all(|(i, &b)| match i {
        4 | 7 => b == b'-',
        10 => b == b' ' || b == b'T',
        13 | 16 => b == b':',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }

    let mut text = String::from_utf8_lossy(head).into_owned();
    text.replace_range(10..11, " ");
    let base = NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S").ok()?;

    let tail = &data[at + TIMESTAMP_LEN..];
    let nanos = match tail.first() {
        Some(b'.') => {
            let digits: Vec<u8> = tail[1..]
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .take(9)
                .copied()
                .collect();
            let scale = 10u32.pow(9 - digits.len() as u32);
            digits
                .iter()
                .fold(0u32, |acc, d| acc * 10 + u32::from(d - b'0'))
                * scale
        }
        _ => 0,
    };

    Some(base.with_nanosecond(nanos)?.and_utc())
}

/// String value following `key` within `region`
fn field_value(region: &[u8], key: &[u8]) -> Option<String> {
    let key_end = find(region, key, 0)? + key.len();
    let window_end = (key_end + VALUE_WINDOW).min(region.len());

    let open = (key_end..window_end)
        .find(|&i| !(region[i].is_ascii_whitespace() || region[i] == b':'))
        .filter(|&i| region[i] == b'"')?;

    let mut value = Vec::new();
    let mut i = open + 1;
    while i < region.len() {
        match region[i] {
            b'"' => return String::from_utf8(value).ok(),
            b'\\' => {
                value.push(*region.get(i + 1)?);
                i += 2;
            }
            b => {
                value.push(b);
                i += 1;
            }
        }
    }

    None
}
