use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::types::UserId;

/// Who the current user is, as claimed by their bearer credential.
/// Decoding is purely local: the signature is the server's business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject_id: UserId,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn new(subject_id: UserId) -> Self {
        Self {
            subject_id,
            expires_at: None,
        }
    }

    /// Decode a credential, returning `None` for anything malformed.
    pub fn decode(credential: &str) -> Option<Self> {
        match Self::try_decode(credential) {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring undecodable credential");
                None
            }
        }
    }

    /// Decode a credential, reporting why it could not be used.
    pub fn try_decode(credential: &str) -> Result<Self, DecodeError> {
        let token = normalize_credential(credential);
        if token.is_empty() {
            return Err(DecodeError::Empty);
        }

        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(DecodeError::Segments(segments.len()));
        }

        let payload = decode_segment(segments[1])?;
        let claims: serde_json::Value =
            serde_json::from_slice(&payload).map_err(|e| DecodeError::Json(e.to_string()))?;

        let subject_id = match claims.get("sub") {
            Some(serde_json::Value::String(s)) if !s.is_empty() => UserId::new(s.clone()),
            Some(serde_json::Value::Number(n)) => UserId::new(n.to_string()),
            _ => return Err(DecodeError::MissingSubject),
        };

        let expires_at = claims
            .get("exp")
            .and_then(|v| v.as_i64())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

        Ok(Self {
            subject_id,
            expires_at,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// The token as it goes on the wire: surrounding whitespace trimmed and one
/// matching pair of double quotes removed. Unbalanced quotes are kept.
pub fn normalize_credential(raw: &str) -> &str {
    let token = raw.trim();
    token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token)
}

// Accepts both alphabets and optional padding.
fn decode_segment(segment: &str) -> Result<Vec<u8>, DecodeError> {
    let normalized: String = segment
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    URL_SAFE_NO_PAD
        .decode(normalized.as_bytes())
        .map_err(|e| DecodeError::Base64(e.to_string()))
}
