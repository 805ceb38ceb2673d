//! Paste availability policy.
//!
//! Everything here is pure: a record plus one timestamp in, a decision out.
//! The state is recomputed on every retrieval and never persisted.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::PasteRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteState {
    Available,
    /// `now >= created_at + ttl_seconds * 1000`. Reported ahead of
    /// `Exhausted` when both hold.
    Expired,
    /// `views >= max_views`.
    Exhausted,
    Absent,
}

impl PasteState {
    /// Expired and exhausted records should be removed from the store.
    pub fn needs_cleanup(self) -> bool {
        matches!(self, PasteState::Expired | PasteState::Exhausted)
    }
}

pub fn evaluate(record: Option<&PasteRecord>, now_ms: i64) -> PasteState {
    let Some(record) = record else {
        return PasteState::Absent;
    };

    if let Some(expires_at) = expires_at_ms(record) {
        if now_ms >= expires_at {
            return PasteState::Expired;
        }
    }

    if let Some(max_views) = record.max_views {
        if record.views >= max_views {
            return PasteState::Exhausted;
        }
    }

    PasteState::Available
}

/// Logical expiry instant in epoch milliseconds, if the paste has a TTL.
pub fn expires_at_ms(record: &PasteRecord) -> Option<i64> {
    record
        .ttl_seconds
        .map(|ttl| record.created_at.saturating_add(ttl.saturating_mul(1000)))
}

/// Views left after a successful read that brought the counter to
/// `new_views`. `None` means unlimited.
pub fn remaining_views(max_views: Option<i64>, new_views: i64) -> Option<i64> {
    max_views.map(|max| (max - new_views).max(0))
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-01-01T00:00:02.000Z`.
pub fn format_timestamp(epoch_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ttl_seconds: Option<i64>, max_views: Option<i64>, views: i64) -> PasteRecord {
        PasteRecord {
            id: "abcd1234".to_string(),
            content: "hello".to_string(),
            created_at: 10_000,
            ttl_seconds,
            max_views,
            views,
            storage_expires_at: None,
        }
    }

    #[test]
    fn missing_record_is_absent() {
        assert_eq!(evaluate(None, 0), PasteState::Absent);
        assert!(!PasteState::Absent.needs_cleanup());
    }

    #[test]
    fn unlimited_paste_stays_available() {
        let r = record(None, None, 1_000_000);
        assert_eq!(evaluate(Some(&r), i64::MAX), PasteState::Available);
        assert_eq!(expires_at_ms(&r), None);
    }

    #[test]
    fn ttl_boundary_is_exclusive() {
        for ttl in [1, 2, 60, 86_400] {
            let r = record(Some(ttl), None, 0);
            let deadline = 10_000 + ttl * 1000;
            assert_eq!(evaluate(Some(&r), deadline - 1), PasteState::Available);
            assert_eq!(evaluate(Some(&r), deadline), PasteState::Expired);
            assert_eq!(evaluate(Some(&r), deadline + 1), PasteState::Expired);
        }
    }

    #[test]
    fn view_limit_boundary() {
        let r = record(None, Some(3), 2);
        assert_eq!(evaluate(Some(&r), 0), PasteState::Available);
        let r = record(None, Some(3), 3);
        assert_eq!(evaluate(Some(&r), 0), PasteState::Exhausted);
        let r = record(None, Some(3), 7);
        assert_eq!(evaluate(Some(&r), 0), PasteState::Exhausted);
    }

    #[test]
    fn expiry_wins_over_exhaustion() {
        let r = record(Some(1), Some(1), 1);
        assert_eq!(evaluate(Some(&r), 11_000), PasteState::Expired);
        assert!(PasteState::Expired.needs_cleanup());
        assert!(PasteState::Exhausted.needs_cleanup());
    }

    #[test]
    fn huge_ttl_does_not_overflow() {
        let r = record(Some(i64::MAX), None, 0);
        assert_eq!(expires_at_ms(&r), Some(i64::MAX));
        assert_eq!(evaluate(Some(&r), 20_000), PasteState::Available);
    }

    #[test]
    fn remaining_views_counts_down_and_clamps() {
        assert_eq!(remaining_views(None, 5), None);
        assert_eq!(remaining_views(Some(2), 1), Some(1));
        assert_eq!(remaining_views(Some(2), 2), Some(0));
        assert_eq!(remaining_views(Some(2), 4), Some(0));
    }

    #[test]
    fn timestamps_render_like_iso_strings() {
        assert_eq!(format_timestamp(2000), "1970-01-01T00:00:02.000Z");
        assert_eq!(format_timestamp(1_700_000_000_123), "2023-11-14T22:13:20.123Z");
    }
}
