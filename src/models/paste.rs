use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use thiserror::Error;

/// A stored paste. Availability is never stored here; it is derived from
/// these fields and the request clock by [`crate::lifecycle::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PasteRecord {
    pub id: String,
    pub content: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    pub ttl_seconds: Option<i64>,
    pub max_views: Option<i64>,
    pub views: i64,
    /// Wall-clock epoch milliseconds after which the storage layer may evict
    /// the record. Hygiene only.
    pub storage_expires_at: Option<i64>,
}

/// Input accepted by `POST /pastes`. Fields are kept loosely typed so that
/// wrong types are reported as validation failures rather than as JSON
/// extraction errors.
#[derive(Debug, Default, Deserialize)]
pub struct CreatePasteRequest {
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub ttl_seconds: Option<Value>,
    #[serde(default)]
    pub max_views: Option<Value>,
}

/// A validated creation request. Only constructible through validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaste {
    content: String,
    ttl_seconds: Option<i64>,
    max_views: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl NewPaste {
    pub fn new(
        content: &str,
        ttl_seconds: Option<i64>,
        max_views: Option<i64>,
    ) -> Result<Self, ValidationError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::new("content must not be empty"));
        }
        if matches!(ttl_seconds, Some(ttl) if ttl < 1) {
            return Err(ValidationError::new(
                "ttl_seconds must be an integer >= 1",
            ));
        }
        if matches!(max_views, Some(max) if max < 1) {
            return Err(ValidationError::new("max_views must be an integer >= 1"));
        }

        Ok(Self {
            content: content.to_string(),
            ttl_seconds,
            max_views,
        })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn ttl_seconds(&self) -> Option<i64> {
        self.ttl_seconds
    }

    pub fn max_views(&self) -> Option<i64> {
        self.max_views
    }
}

impl TryFrom<CreatePasteRequest> for NewPaste {
    type Error = ValidationError;

    fn try_from(request: CreatePasteRequest) -> Result<Self, Self::Error> {
        let content = match request.content {
            Some(Value::String(content)) => content,
            _ => return Err(ValidationError::new("content must be a non-empty string")),
        };
        let ttl_seconds = positive_integer("ttl_seconds", request.ttl_seconds.as_ref())?;
        let max_views = positive_integer("max_views", request.max_views.as_ref())?;

        NewPaste::new(&content, ttl_seconds, max_views)
    }
}

/// Accepts whole JSON numbers (including `2.0`) that are at least 1. `null`
/// and a missing field both mean "not set".
fn positive_integer(field: &str, value: Option<&Value>) -> Result<Option<i64>, ValidationError> {
    let invalid = || ValidationError::new(format!("{field} must be an integer >= 1"));

    let number = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => number,
        Some(_) => return Err(invalid()),
    };

    let parsed = match number.as_i64() {
        Some(n) => Some(n),
        None => number
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| f as i64),
    };

    match parsed {
        Some(n) if n >= 1 => Ok(Some(n)),
        _ => Err(invalid()),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePasteResponse {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PasteView {
    pub content: String,
    pub remaining_views: Option<i64>,
    pub expires_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: Value) -> CreatePasteRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn content_is_trimmed() {
        let paste = NewPaste::try_from(request(json!({"content": "  hello \n"}))).unwrap();
        assert_eq!(paste.content(), "hello");
        assert_eq!(paste.ttl_seconds(), None);
        assert_eq!(paste.max_views(), None);
    }

    #[test]
    fn rejects_missing_empty_or_blank_content() {
        for body in [
            json!({}),
            json!({"content": ""}),
            json!({"content": "   \t\n"}),
            json!({"content": 42}),
            json!({"content": null}),
        ] {
            assert!(NewPaste::try_from(request(body.clone())).is_err(), "{body}");
        }
    }

    #[test]
    fn rejects_non_positive_or_fractional_limits() {
        for body in [
            json!({"content": "x", "ttl_seconds": 0}),
            json!({"content": "x", "ttl_seconds": -1}),
            json!({"content": "x", "ttl_seconds": 1.5}),
            json!({"content": "x", "ttl_seconds": "10"}),
            json!({"content": "x", "max_views": 0}),
            json!({"content": "x", "max_views": true}),
            json!({"content": "x", "ttl_seconds": 1e300}),
            json!({"content": "x", "max_views": 1e19}),
            json!({"content": "x", "ttl_seconds": 18446744073709551615u64}),
        ] {
            assert!(NewPaste::try_from(request(body.clone())).is_err(), "{body}");
        }
    }

    #[test]
    fn accepts_whole_numbers_and_null_limits() {
        let paste = NewPaste::try_from(request(
            json!({"content": "x", "ttl_seconds": 2.0, "max_views": null}),
        ))
        .unwrap();
        assert_eq!(paste.ttl_seconds(), Some(2));
        assert_eq!(paste.max_views(), None);

        let paste =
            NewPaste::try_from(request(json!({"content": "x", "ttl_seconds": 60, "max_views": 3})))
                .unwrap();
        assert_eq!(paste.ttl_seconds(), Some(60));
        assert_eq!(paste.max_views(), Some(3));
    }

    #[test]
    fn error_message_names_the_field() {
        let err = NewPaste::try_from(request(json!({"content": "x", "max_views": 0}))).unwrap_err();
        assert!(err.to_string().contains("max_views"));
    }
}
