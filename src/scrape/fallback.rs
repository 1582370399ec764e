//! Generic fallback-ladder executor.
//!
//! One ordered list of named attempts replaces the nested try/catch
//! pyramids that otherwise accumulate around every extractor. Rungs run
//! strictly sequentially, the first non-empty success wins outright, and
//! total exhaustion surfaces every rung's error at once.

use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use super::ScrapeError;

/// Record of one failed attempt inside a ladder. Ephemeral: lives only in
/// logs and in the terminal [`ScrapeError::Exhausted`] error.
#[derive(Debug, Clone)]
pub struct ScrapeAttempt {
    /// Rung label, e.g. `direct-http` or `firefox-proxy`.
    pub rung: String,
    /// Error message the rung failed with.
    pub error: String,
}

/// Values a ladder can produce. An "empty" value is treated as a failure
/// and falls through to the next rung; no strategy silently returns empty
/// success.
pub trait LadderValue {
    fn is_empty_value(&self) -> bool;
}

impl LadderValue for String {
    fn is_empty_value(&self) -> bool {
        self.trim().is_empty()
    }
}

impl<T> LadderValue for Vec<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

/// One named attempt in a ladder.
pub struct Rung<'a, T> {
    pub name: &'static str,
    pub attempt: BoxFuture<'a, Result<T, ScrapeError>>,
}

impl<'a, T> Rung<'a, T> {
    pub fn new(name: &'static str, attempt: BoxFuture<'a, Result<T, ScrapeError>>) -> Self {
        Self { name, attempt }
    }
}

/// Try rungs in order, returning the first non-empty success.
///
/// Rung N+1 never starts before rung N settles. `delay` is applied between
/// consecutive attempts (not before the first). If every rung fails, an
/// [`ScrapeError::Exhausted`] error names the operation and the URL and
/// aggregates each rung's failure.
pub async fn run_ladder<T: LadderValue>(
    operation: &str,
    url: &str,
    rungs: Vec<Rung<'_, T>>,
    delay: Duration,
) -> Result<T, ScrapeError> {
    let mut attempts: Vec<ScrapeAttempt> = Vec::new();

    for (index, rung) in rungs.into_iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        debug!("{} attempt via {} for {}", operation, rung.name, url);

        match rung.attempt.await {
            Ok(value) if !value.is_empty_value() => {
                debug!("{} succeeded via {} for {}", operation, rung.name, url);
                return Ok(value);
            }
            Ok(_) => {
                debug!("{} via {} returned empty content for {}", operation, rung.name, url);
                attempts.push(ScrapeAttempt {
                    rung: rung.name.to_string(),
                    error: "empty content".to_string(),
                });
            }
            Err(e) => {
                debug!("{} via {} failed for {}: {}", operation, rung.name, url, e);
                attempts.push(ScrapeAttempt {
                    rung: rung.name.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    warn!("{} exhausted all methods for {}", operation, url);
    Err(ScrapeError::Exhausted {
        operation: operation.to_string(),
        url: url.to_string(),
        attempts,
    })
}
