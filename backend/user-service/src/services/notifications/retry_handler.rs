/// Retry handler for push notification failures
///
/// Implements exponential backoff retry strategy with dead-letter queue
use std::time::Duration;
use tokio::time::sleep;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Initial delay between retries (default: 100ms)
    pub initial_delay: Duration,
    /// Maximum delay between retries (default: 5s)
    pub max_delay: Duration,
    /// Maximum number of retry attempts (default: 3)
    pub max_attempts: usize,
    /// Backoff multiplier (default: 2.0 for exponential)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            max_attempts: 3,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Calculate delay for a given attempt number
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::from_millis(0);
        }

        let delay_ms = (self.initial_delay.as_millis() as f64)
            * self.backoff_multiplier.powi((attempt - 1) as i32);

        let delay = Duration::from_millis(delay_ms as u64);

        // Cap at max delay
        if delay > self.max_delay {
            self.max_delay
        } else {
            delay
        }
    }
}

/// Retry handler for async operations
pub struct RetryHandler {
    config: RetryConfig,
}

impl RetryHandler {
    /// Create new retry handler with config
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Create retry handler with default config
    pub fn default() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Execute operation with retry logic
    ///
    /// Returns Ok(result) on success, or Err(last_error) if all retries exhausted
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let mut last_error = None;

        for attempt in 0..self.config.max_attempts {
            // Execute operation
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = Some(e);

                    // Don't delay after last attempt
                    if attempt < self.config.max_attempts - 1 {
                        let delay = self.config.calculate_delay(attempt + 1);
                        sleep(delay).await;
                    }
                }
            }
        }

        // All retries exhausted
        Err(last_error.unwrap())
    }

    /// Check if error is retryable
    pub fn is_retryable(error: &str) -> bool {
        // Retryable errors: timeouts, rate limits, temporary server errors
        error.contains("timeout")
            || error.contains("429") // Rate limit
            || error.contains("500") // Internal server error
            || error.contains("502") // Bad gateway
            || error.contains("503") // Service unavailable
            || error.contains("504") // Gateway timeout
            || error.contains("connection")
    }
}
