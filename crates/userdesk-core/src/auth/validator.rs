//! Session validity checks.
//!
//! `check` is pure: it looks at a session snapshot and the current time and
//! returns a verdict. `enforce` applies the verdict to the store, clearing
//! malformed or expired sessions so they can never be used again without a
//! fresh login. `validate_token` composes the two and is what callers use.

use thiserror::Error;
use tracing::{debug, warn};

use super::store::{Session, SessionStore};

/// Maximum session age: 24 hours in milliseconds.
pub const SESSION_MAX_AGE_MS: i64 = 24 * 60 * 60 * 1000;

/// Tokens shorter than this are rejected as malformed.
/// This is a coarse sanity check, not cryptographic validation.
/// Length is counted in chars (Unicode scalar values), not UTF-16 units.
pub const MIN_TOKEN_LENGTH: usize = 10;

/// Why a session was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    #[error("No token found")]
    NoToken,

    #[error("Invalid token format")]
    InvalidFormat,

    #[error("Session expired. Please login again")]
    Expired,
}

impl InvalidReason {
    /// Whether this rejection must also wipe the stored session.
    pub fn clears_session(&self) -> bool {
        matches!(self, InvalidReason::InvalidFormat | InvalidReason::Expired)
    }
}

/// Result of validating the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub is_valid: bool,
    pub reason: Option<InvalidReason>,
}

impl Verdict {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: InvalidReason) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason),
        }
    }

    /// User-facing message for a rejected session, if any.
    pub fn message(&self) -> Option<String> {
        self.reason.map(|r| r.to_string())
    }
}

/// Judge a session snapshot at time `now` (ms since epoch). No side effects.
pub fn check(session: Option<&Session>, now: i64) -> Verdict {
    let Some(session) = session else {
        return Verdict::invalid(InvalidReason::NoToken);
    };

    if session.token.chars().count() < MIN_TOKEN_LENGTH {
        return Verdict::invalid(InvalidReason::InvalidFormat);
    }

    if let Some(issued_at) = session.issued_at {
        // A timestamp in the future (clock skew) counts as age zero
        let age = now.saturating_sub(issued_at).max(0);
        if age > SESSION_MAX_AGE_MS {
            return Verdict::invalid(InvalidReason::Expired);
        }
    }

    Verdict::valid()
}

/// Apply a verdict to the store: malformed and expired sessions are cleared.
pub fn enforce(store: &dyn SessionStore, verdict: &Verdict) {
    if let Some(reason) = verdict.reason {
        if reason.clears_session() {
            debug!(%reason, "Clearing rejected session");
            if let Err(e) = store.clear() {
                warn!(error = %e, "Failed to clear rejected session");
            }
        }
    }
}

/// Validate the stored session at time `now`.
///
/// This may mutate the store: a malformed or expired session is cleared as a
/// side effect, so a repeated call reports `NoToken`.
pub fn validate_token(store: &dyn SessionStore, now: i64) -> Verdict {
    let session = store.get();
    let verdict = check(session.as_ref(), now);
    enforce(store, &verdict);
    verdict
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::{MemorySessionStore, TOKEN_KEY};

    const T0: i64 = 1_700_000_000_000;

    fn session(token: &str, issued_at: Option<i64>) -> Session {
        Session {
            token: token.to_string(),
            issued_at,
        }
    }

    // -------------------------------------------------------------------------
    // check()
    // -------------------------------------------------------------------------

    #[test]
    fn test_check_no_session() {
        for now in [0, T0, i64::MAX] {
            assert_eq!(check(None, now), Verdict::invalid(InvalidReason::NoToken));
        }
    }

    #[test]
    fn test_check_short_tokens_are_malformed() {
        for token in ["a", "short", "123456789", "ééééééééé"] {
            let verdict = check(Some(&session(token, Some(T0))), T0);
            assert_eq!(verdict, Verdict::invalid(InvalidReason::InvalidFormat), "token {:?}", token);
        }
    }

    #[test]
    fn test_check_length_counts_characters() {
        // 10 multi-byte characters is long enough
        let verdict = check(Some(&session("éééééééééé", Some(T0))), T0);
        assert!(verdict.is_valid);
    }

    #[test]
    fn test_check_expiry_boundary() {
        let s = session("abcdefghij", Some(T0));
        assert!(check(Some(&s), T0 + SESSION_MAX_AGE_MS - 1).is_valid);
        // Exactly the max age is still valid; only strictly older expires
        assert!(check(Some(&s), T0 + SESSION_MAX_AGE_MS).is_valid);
        assert_eq!(
            check(Some(&s), T0 + SESSION_MAX_AGE_MS + 1),
            Verdict::invalid(InvalidReason::Expired)
        );
    }

    #[test]
    fn test_check_just_under_boundary() {
        let now = T0;
        let s = session("abcdefghij", Some(now - SESSION_MAX_AGE_MS + 1));
        assert!(check(Some(&s), now).is_valid);
    }

    #[test]
    fn test_check_missing_timestamp_is_valid() {
        let s = session("abcdefghij", None);
        assert_eq!(check(Some(&s), i64::MAX), Verdict::valid());
    }

    #[test]
    fn test_check_future_timestamp_is_valid() {
        let s = session("abcdefghij", Some(T0 + 60_000));
        assert!(check(Some(&s), T0).is_valid);
    }

    #[test]
    fn test_format_checked_before_expiry() {
        let s = session("short", Some(0));
        assert_eq!(
            check(Some(&s), T0).reason,
            Some(InvalidReason::InvalidFormat)
        );
    }

    // -------------------------------------------------------------------------
    // validate_token()
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_no_token_is_idempotent() {
        let store = MemorySessionStore::new();
        let first = validate_token(&store, T0);
        let second = validate_token(&store, T0);
        assert_eq!(first, Verdict::invalid(InvalidReason::NoToken));
        assert_eq!(first, second);
        assert_eq!(first.message().as_deref(), Some("No token found"));
    }

    #[test]
    fn test_validate_fresh_session() {
        let store = MemorySessionStore::new();
        store.set("abcdefghij", T0).unwrap();
        let verdict = validate_token(&store, T0 + 1000);
        assert!(verdict.is_valid);
        assert_eq!(verdict.reason, None);
        assert!(store.get().is_some());
    }

    #[test]
    fn test_validate_expired_session_clears_store() {
        let store = MemorySessionStore::new();
        store.set("abcdefghij", T0).unwrap();

        let verdict = validate_token(&store, T0 + 86_400_001);
        assert!(!verdict.is_valid);
        assert!(verdict.message().unwrap().to_lowercase().contains("expired"));
        assert_eq!(store.get(), None);

        // Cleared, so the next check no longer repeats the expiry message
        assert_eq!(
            validate_token(&store, T0 + 86_400_001).reason,
            Some(InvalidReason::NoToken)
        );
    }

    #[test]
    fn test_validate_long_expired_sessions() {
        for age in [86_400_001, 2 * SESSION_MAX_AGE_MS, 365 * SESSION_MAX_AGE_MS] {
            let store = MemorySessionStore::new();
            store.set("abcdefghij", T0 - age).unwrap();
            assert_eq!(validate_token(&store, T0).reason, Some(InvalidReason::Expired));
            assert_eq!(store.get(), None);
        }
    }

    #[test]
    fn test_validate_malformed_token_clears_store() {
        let store = MemorySessionStore::new();
        store.set("short", T0).unwrap();

        let verdict = validate_token(&store, T0);
        assert!(!verdict.is_valid);
        assert!(verdict.message().unwrap().contains("format"));
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_validate_legacy_session_without_timestamp() {
        let store = MemorySessionStore::with_entries([(TOKEN_KEY, "QpwL5tke4Pnpja7X4")]);
        assert!(validate_token(&store, T0).is_valid);
        assert!(store.get().is_some());
    }

    #[test]
    fn test_only_format_and_expiry_clear() {
        assert!(!InvalidReason::NoToken.clears_session());
        assert!(InvalidReason::InvalidFormat.clears_session());
        assert!(InvalidReason::Expired.clears_session());
    }
}
