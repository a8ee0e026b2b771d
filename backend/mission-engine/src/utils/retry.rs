use std::time::Duration;

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(1000),
            jitter_max: Some(Duration::from_millis(50)),
        }
    }
}

impl RetryConfig {
    pub fn with_attempts(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }
}

/// Retries only while `should_retry` accepts the error; anything else is
/// returned immediately.
pub async fn retry_async_when<F, Fut, T, E, P>(
    config: RetryConfig,
    mut f: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempts_left = config.max_attempts;
    let mut backoff = config.base_backoff;

    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                attempts_left = attempts_left.saturating_sub(1);
                if attempts_left == 0 || !should_retry(&e) {
                    return Err(e);
                }

                let wait = match config.jitter_max {
                    Some(jitter_max) => {
                        let jitter_ms = jitter_max.as_millis() as u64;
                        let extra = if jitter_ms == 0 {
                            0
                        } else {
                            rand::random::<u64>() % (jitter_ms + 1)
                        };
                        backoff + Duration::from_millis(extra)
                    }
                    None => backoff,
                };
                tracing::debug!("Retrying after {:?} ({} attempts left)", wait, attempts_left);
                tokio::time::sleep(wait).await;

                backoff = std::cmp::min(backoff * 2, config.max_backoff);
            }
        }
    }
}
