//! Bounded polling waits
//!
//! Every wait in webcheck goes through [`poll_until`]; nothing blocks on the
//! remote browser without a deadline.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::common::{Error, Result};

use super::{BrowserSession, ElementRef, Locator};

/// Poll `check` until it yields a value or `timeout` expires.
///
/// The check runs at least once. `Ok(None)` from it means "not yet";
/// an error aborts the wait and is returned as is. Returns `Ok(None)` when
/// the deadline passes without a value.
pub async fn poll_until<T, F, Fut>(timeout: Duration, interval: Duration, mut check: F) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = check().await? {
            return Ok(Some(value));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        sleep(interval.min(deadline - now)).await;
    }
}

/// Wait for `locator` to resolve in the current browsing context.
///
/// `Ok(None)` on timeout; protocol errors other than "no such element" abort.
pub async fn wait_for_element(
    session: &dyn BrowserSession,
    locator: &Locator,
    timeout: Duration,
    interval: Duration,
) -> Result<Option<ElementRef>> {
    poll_until(timeout, interval, || async move {
        match session.find_element(locator).await {
            Ok(element) => Ok(Some(element)),
            Err(Error::ElementNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    })
    .await
}
