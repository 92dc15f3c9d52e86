//! Upstream session credential.

use std::fmt;
use time::{Duration, OffsetDateTime};

/// A session token issued by the upstream login exchange.
///
/// `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    /// `None` when the upstream did not say when the token lapses.
    pub expires_at: Option<OffsetDateTime>,
}

impl Credential {
    pub fn new(token: impl Into<String>, expires_at: Option<OffsetDateTime>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Whether the credential is inside its refresh window at `now`.
    ///
    /// A credential without an expiry is only replaced after the upstream
    /// rejects it.
    pub fn needs_refresh(&self, now: OffsetDateTime, skew: Duration) -> bool {
        match self.expires_at {
            // A skew reaching past the date range puts every moment in the window.
            Some(expires_at) => expires_at.checked_sub(skew).is_none_or(|start| now >= start),
            None => false,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_needs_refresh_with_skew_beyond_date_range() {
        let cred = Credential::new("t", Some(datetime!(2024-01-01 12:00 UTC)));
        let skew = Duration::seconds(i64::MAX);

        assert!(cred.needs_refresh(datetime!(2020-01-01 00:00 UTC), skew));
    }

    #[test]
    fn test_needs_refresh_honors_skew() {
        let cred = Credential::new("t", Some(datetime!(2024-01-01 12:00 UTC)));
        let skew = Duration::minutes(5);

        assert!(!cred.needs_refresh(datetime!(2024-01-01 11:54:59 UTC), skew));
        assert!(cred.needs_refresh(datetime!(2024-01-01 11:55 UTC), skew));
        assert!(cred.needs_refresh(datetime!(2024-01-01 13:00 UTC), skew));
    }

    #[test]
    fn test_no_expiry_never_needs_refresh() {
        let cred = Credential::new("t", None);
        assert!(!cred.needs_refresh(datetime!(2099-01-01 00:00 UTC), Duration::hours(1)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let cred = Credential::new("super-secret", None);
        let debug = format!("{cred:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("redacted"));
    }
}
