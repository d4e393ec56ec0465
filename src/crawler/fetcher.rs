//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client
//! - Rotating the User-Agent on every attempt
//! - Classifying each attempt as success, retryable or fatal
//! - Retrying with exponential backoff until the attempt budget runs out

use crate::config::{FetcherConfig, DEFAULT_USER_AGENTS};
use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// How many times a URL is tried and how long to wait in between
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per URL, the first one included
    pub max_attempts: u32,

    /// Pause after the first failed attempt
    pub initial_backoff: Duration,

    /// Multiplier applied to the pause after every failed attempt
    pub backoff_factor: f64,

    /// Timeout for a single attempt
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(800),
            backoff_factor: 1.7,
            request_timeout: Duration::from_secs(20),
        }
    }
}

impl From<&FetcherConfig> for RetryPolicy {
    fn from(config: &FetcherConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            backoff_factor: config.backoff_factor,
            request_timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl RetryPolicy {
    /// The pauses slept between consecutive attempts
    ///
    /// Entry `k` is the wait before attempt `k + 2`; there are
    /// `max_attempts - 1` entries because nothing is slept after the last one.
    pub fn delays(&self) -> Vec<Duration> {
        let mut delays = Vec::new();
        let mut backoff = self.initial_backoff;
        for _ in 1..self.max_attempts {
            delays.push(backoff);
            backoff = self.grow(backoff);
        }
        delays
    }

    fn grow(&self, backoff: Duration) -> Duration {
        Duration::try_from_secs_f64(backoff.as_secs_f64() * self.backoff_factor)
            .unwrap_or(Duration::MAX)
    }
}

/// Why an attempt is worth repeating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// HTTP 429 or 403: the server wants us to slow down
    RateLimited(u16),

    /// Any other HTTP status >= 400
    HttpStatus(u16),

    /// Connection, timeout or body read failure
    Transport(String),
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited(code) => write!(f, "rate limited (HTTP {})", code),
            Self::HttpStatus(code) => write!(f, "HTTP {}", code),
            Self::Transport(error) => write!(f, "{}", error),
        }
    }
}

/// Result of a single HTTP attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Page body of a response with status < 400
    Success(String),

    /// Failed, but another attempt may succeed
    Retryable(RetryReason),

    /// Failed in a way no retry can fix
    Fatal(String),
}

/// A URL that could not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("giving up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: RetryReason,
    },

    #[error("cannot fetch {url}: {reason}")]
    Fatal { url: String, reason: String },
}

/// Builds the HTTP client shared by all fetches
///
/// No default User-Agent is set: every attempt sends its own.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches listing pages with retries, backoff and User-Agent rotation
pub struct PageFetcher {
    client: Client,
    policy: RetryPolicy,
    user_agents: Vec<String>,
}

impl PageFetcher {
    /// Creates a fetcher from configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use shelf_harvest::config::FetcherConfig;
    /// use shelf_harvest::crawler::PageFetcher;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let fetcher = PageFetcher::new(&FetcherConfig::default())?;
    /// let html = fetcher.fetch("https://books.toscrape.com/index.html").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(
            build_http_client()?,
            RetryPolicy::from(config),
            config.user_agents.clone(),
        ))
    }

    pub fn with_client(client: Client, policy: RetryPolicy, user_agents: Vec<String>) -> Self {
        Self {
            client,
            policy,
            user_agents,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn pick_user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(DEFAULT_USER_AGENTS[0])
    }

    /// Fetches a URL, retrying until it succeeds or the attempt budget is spent
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Status < 400 | Return body |
    /// | HTTP 429 / 403 | Wait backoff, grow it, retry |
    /// | Other HTTP >= 400 | Wait backoff, grow it, retry |
    /// | Timeout / network error | Wait backoff, grow it, retry |
    /// | Request cannot be built | Fail immediately |
    /// | Last attempt fails | `FetchError::Exhausted` |
    ///
    /// Backoff starts over for every call.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut backoff = self.policy.initial_backoff;
        let mut attempt = 1;

        loop {
            let user_agent = self.pick_user_agent();
            tracing::debug!("GET {} (attempt {}/{})", url, attempt, self.policy.max_attempts);

            let reason = match self.attempt(url, user_agent).await {
                AttemptOutcome::Success(body) => return Ok(body),
                AttemptOutcome::Fatal(reason) => {
                    return Err(FetchError::Fatal {
                        url: url.to_string(),
                        reason,
                    })
                }
                AttemptOutcome::Retryable(reason) => reason,
            };

            if attempt >= self.policy.max_attempts {
                return Err(FetchError::Exhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    last: reason,
                });
            }

            match &reason {
                RetryReason::RateLimited(code) => tracing::info!(
                    "Server answered {} for {}, waiting {:?} (attempt {})",
                    code,
                    url,
                    backoff,
                    attempt
                ),
                other => tracing::info!(
                    "Retrying {} in {:?} after error: {} (attempt {})",
                    url,
                    backoff,
                    other,
                    attempt
                ),
            }

            tokio::time::sleep(backoff).await;
            backoff = self.policy.grow(backoff);
            attempt += 1;
        }
    }

    /// Performs one GET and classifies the response
    pub async fn attempt(&self, url: &str, user_agent: &str) -> AttemptOutcome {
        let response = match self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, "text/html")
            .timeout(self.policy.request_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_builder() => return AttemptOutcome::Fatal(e.to_string()),
            Err(e) => return AttemptOutcome::Retryable(RetryReason::Transport(describe(&e))),
        };

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN {
            return AttemptOutcome::Retryable(RetryReason::RateLimited(status.as_u16()));
        }

        if status.as_u16() >= 400 {
            return AttemptOutcome::Retryable(RetryReason::HttpStatus(status.as_u16()));
        }

        match response.text().await {
            Ok(body) => AttemptOutcome::Success(body),
            Err(e) => AttemptOutcome::Retryable(RetryReason::Transport(describe(&e))),
        }
    }
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else {
        error.to_string()
    }
}
