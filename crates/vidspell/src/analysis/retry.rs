//! Bounded retry for per-frame model calls.

use std::future::Future;

/// What one attempt produced.
#[derive(Debug)]
pub enum Step<T, R> {
    /// Final value; stop retrying.
    Done(T),
    /// Retryable rejection.
    Retry(R),
}

/// Every attempt was rejected.
#[derive(Debug, PartialEq)]
pub struct Exhausted<R> {
    pub attempts: u32,
    pub last: R,
}

/// Runs `op` once, then up to `max_retries` more times while it asks to retry.
///
/// `op` receives the 0-based attempt number. No state is shared between calls
/// of `attempt`.
pub async fn attempt<T, R, F, Fut>(max_retries: u32, mut op: F) -> Result<T, Exhausted<R>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Step<T, R>>,
{
    let mut number = 0;
    loop {
        match op(number).await {
            Step::Done(value) => return Ok(value),
            Step::Retry(rejection) => {
                if number >= max_retries {
                    return Err(Exhausted {
                        attempts: number + 1,
                        last: rejection,
                    });
                }
                number += 1;
            }
        }
    }
}
