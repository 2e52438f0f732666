//! Poll rate limiting for the token endpoint (CIBA Core section 11).
//!
//! The grant only records its negotiated interval; the caller keeps the time
//! of the last poll per `auth_req_id` and asks [`SlowDownPolicy`] before
//! polling.

use time::OffsetDateTime;

use crate::AuthResult;
use crate::error::{AuthError, OAuthErrorCode};

/// Rejects polls that arrive faster than the interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlowDownPolicy {
    /// Seconds added to the interval after each `slow_down`.
    pub increment: u64,
}

impl Default for SlowDownPolicy {
    fn default() -> Self {
        Self { increment: 5 }
    }
}

impl SlowDownPolicy {
    /// Checks a poll at `now` against the previous one.
    ///
    /// # Errors
    ///
    /// Returns a `slow_down` error if fewer than `interval` seconds passed
    /// since `last_poll`.
    pub fn check(
        &self,
        last_poll: Option<OffsetDateTime>,
        now: OffsetDateTime,
        interval: u64,
    ) -> AuthResult<()> {
        let Some(last_poll) = last_poll else {
            return Ok(());
        };

        let elapsed = (now - last_poll).whole_seconds();
        if u64::try_from(elapsed).is_ok_and(|elapsed| elapsed >= interval) {
            return Ok(());
        }

        Err(AuthError::bad_request(
            OAuthErrorCode::SlowDown,
            format!("polling interval is {interval} seconds"),
        ))
    }

    /// Interval the client must use after a `slow_down`.
    #[must_use]
    pub fn next_interval(&self, interval: u64) -> u64 {
        interval.saturating_add(self.increment)
    }
}
