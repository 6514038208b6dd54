//! Client-side waiting.
//!
//! Waits re-issue a request until it produces a result or the timeout
//! expires. A request already in flight always runs to completion; expiry is
//! only checked between attempts.

use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::{Duration, Instant};

use tether_core::error::TwinError;

/// Interval between polling attempts.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long a wait may take. Zero means a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout(Option<Duration>);

impl Timeout {
    pub const ZERO: Timeout = Timeout(Some(Duration::ZERO));
    pub const INFINITE: Timeout = Timeout(None);
    pub const DEFAULT: Timeout = Timeout(Some(Duration::from_secs(30)));

    pub const fn from_duration(duration: Duration) -> Self {
        Timeout(Some(duration))
    }

    /// Seconds, where `f64::INFINITY` means no limit.
    pub fn from_secs_f64(seconds: f64) -> Result<Self, TwinError> {
        if seconds == f64::INFINITY {
            return Ok(Timeout::INFINITE);
        }
        Duration::try_from_secs_f64(seconds)
            .map(Timeout::from_duration)
            .map_err(|_| TwinError::InvalidArgument(format!("invalid timeout {}", seconds)))
    }

    pub fn as_duration(self) -> Option<Duration> {
        self.0
    }

    pub fn is_infinite(self) -> bool {
        self.0.is_none()
    }

    /// Seconds, `f64::INFINITY` for no limit. This is the form the server
    /// accepts in request bodies.
    pub fn as_secs_f64(self) -> f64 {
        self.0.map_or(f64::INFINITY, |d| d.as_secs_f64())
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Timeout::DEFAULT
    }
}

impl FromStr for Timeout {
    type Err = TwinError;

    /// Seconds as a decimal number, or `inf`/`infinite`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if matches!(
            trimmed.to_ascii_lowercase().as_str(),
            "inf" | "infinite" | "infinity"
        ) {
            return Ok(Timeout::INFINITE);
        }
        let seconds: f64 = trimmed
            .parse()
            .map_err(|_| TwinError::InvalidArgument(format!("invalid timeout '{}'", s)))?;
        Timeout::from_secs_f64(seconds)
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(d) => write!(f, "{}s", d.as_secs_f64()),
            None => f.write_str("infinite"),
        }
    }
}

/// Call `attempt` until it yields a value or `timeout` runs out.
///
/// The first attempt always happens. Returns `Ok(None)` on expiry; errors
/// from an attempt end the wait immediately. A timeout too large to place on
/// the clock waits without a deadline.
pub(crate) fn poll<T>(
    timeout: Timeout,
    mut attempt: impl FnMut() -> Result<Option<T>, TwinError>,
) -> Result<Option<T>, TwinError> {
    let deadline = timeout
        .as_duration()
        .and_then(|d| Instant::now().checked_add(d));
    loop {
        if let Some(found) = attempt()? {
            return Ok(Some(found));
        }
        let pause = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(None);
                }
                POLL_INTERVAL.min(deadline - now)
            }
            None => POLL_INTERVAL,
        };
        thread::sleep(pause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timeouts() {
        assert_eq!("inf".parse::<Timeout>().unwrap(), Timeout::INFINITE);
        assert_eq!("0".parse::<Timeout>().unwrap(), Timeout::ZERO);
        assert_eq!(
            "1.5".parse::<Timeout>().unwrap(),
            Timeout::from_duration(Duration::from_millis(1500))
        );
        assert!("-1".parse::<Timeout>().is_err());
        assert!("soon".parse::<Timeout>().is_err());
    }

    #[test]
    fn test_zero_timeout_attempts_once() {
        let mut calls = 0;
        let result: Option<()> = poll(Timeout::ZERO, || {
            calls += 1;
            Ok(None)
        })
        .unwrap();
        assert!(result.is_none());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_poll_retries_until_found() {
        let mut calls = 0;
        let result = poll(Timeout::INFINITE, || {
            calls += 1;
            Ok((calls == 3).then_some(calls))
        })
        .unwrap();
        assert_eq!(result, Some(3));
    }

    #[test]
    fn test_poll_stops_on_error() {
        let err = poll::<()>(Timeout::INFINITE, || Err(TwinError::invalid_state("boom")))
            .unwrap_err();
        assert!(matches!(err, TwinError::InvalidState(_)));
    }

    #[test]
    fn test_wait_with_huge_timeout_does_not_overflow() {
        let timeout: Timeout = "1e19".parse().unwrap();
        assert!(!timeout.is_infinite());
        let mut calls = 0;
        let result = poll(timeout, || {
            calls += 1;
            Ok(Some(calls))
        })
        .unwrap();
        assert_eq!(result, Some(1));
    }

    #[test]
    fn test_poll_expires() {
        let start = Instant::now();
        let result: Option<()> = poll(
            Timeout::from_duration(Duration::from_millis(250)),
            || Ok(None),
        )
        .unwrap();
        assert!(result.is_none());
        assert!(start.elapsed() >= Duration::from_millis(250));
    }
}
