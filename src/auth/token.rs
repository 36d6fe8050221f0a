//! Token data model

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Short-lived bearer token for the storage API
///
/// Serialized as `{"token": "...", "expiry": "<RFC 3339>"}`. The capitalized
/// field names written by older tools are accepted when reading.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    #[serde(rename = "token", alias = "Token")]
    pub value: String,
    #[serde(rename = "expiry", alias = "Expiry")]
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Token valid for `expires_in` seconds from now
    ///
    /// Lifetimes past the representable range saturate at the min/max timestamp.
    pub fn expiring_in(value: impl Into<String>, expires_in: i64) -> Self {
        let saturated = if expires_in > 0 {
            DateTime::<Utc>::MAX_UTC
        } else {
            DateTime::<Utc>::MIN_UTC
        };
        let expires_at = expiry_after(expires_in).unwrap_or(saturated);
        Self::new(value, expires_at)
    }

    /// Like [`AccessToken::expiring_in`], but `None` when the expiry is out of range
    pub fn try_expiring_in(value: impl Into<String>, expires_in: i64) -> Option<Self> {
        expiry_after(expires_in).map(|expires_at| Self::new(value, expires_at))
    }

    /// Usable iff the expiry is strictly after `now`; there is no grace window
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    pub fn is_usable(&self) -> bool {
        self.is_usable_at(Utc::now())
    }

    /// `Authorization` header value
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

fn expiry_after(seconds: i64) -> Option<DateTime<Utc>> {
    Utc::now().checked_add_signed(Duration::try_seconds(seconds)?)
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Long-lived user credentials used to mint new access tokens
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_is_strict() {
        let now = Utc::now();
        let token = AccessToken::new("ya29.x", now);
        assert!(!token.is_usable_at(now));
        assert!(token.is_usable_at(now - Duration::milliseconds(1)));
        assert!(!token.is_usable_at(now + Duration::seconds(1)));
    }

    #[test]
    fn test_expiring_in() {
        assert!(AccessToken::expiring_in("a", 3600).is_usable());
        assert!(!AccessToken::expiring_in("a", -1).is_usable());
    }

    #[test]
    fn test_expiry_out_of_range() {
        assert!(AccessToken::try_expiring_in("a", i64::MAX).is_none());
        assert!(AccessToken::try_expiring_in("a", i64::MIN).is_none());
        assert!(AccessToken::try_expiring_in("a", 60).is_some());

        let far = AccessToken::expiring_in("a", i64::MAX);
        assert_eq!(far.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(far.is_usable());
        assert!(!AccessToken::expiring_in("a", i64::MIN).is_usable());
    }

    #[test]
    fn test_json_shape() {
        let token = AccessToken::new(
            "ya29.abc",
            DateTime::parse_from_rfc3339("2030-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["token"], "ya29.abc");
        assert_eq!(json["expiry"], "2030-01-02T03:04:05Z");
    }

    #[test]
    fn test_accepts_capitalized_fields() {
        let json = r#"{"Token":"ya29.abc","Expiry":"2030-01-02T03:04:05.123456789-05:00"}"#;
        let token: AccessToken = serde_json::from_str(json).unwrap();
        assert_eq!(token.value, "ya29.abc");
        assert_eq!(token.expires_at.to_rfc3339(), "2030-01-02T08:04:05.123456789+00:00");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let token = AccessToken::expiring_in("ya29.secret", 60);
        assert!(!format!("{:?}", token).contains("secret"));

        let record = CredentialRecord {
            client_id: "id.apps".to_string(),
            client_secret: "shh".to_string(),
            refresh_token: "1//rt".to_string(),
        };
        let shown = format!("{:?}", record);
        assert!(shown.contains("id.apps"));
        assert!(!shown.contains("shh"));
        assert!(!shown.contains("1//rt"));
    }
}
