// src/core/retry.rs
//! Retry policy for individual HTTP calls.

use super::request::Request;
use super::transport::{RawResponse, Transport, TransportError};
use crate::constants::REQUEST_MAX_ATTEMPTS;
use crate::error::RequestError;
use std::time::Duration;

/// How many times a call is attempted and how long to wait in between.
///
/// Timeouts, interrupted bodies, 5xx and 409 responses are retried; any
/// other failure ends the call at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: REQUEST_MAX_ATTEMPTS,
            delay: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub fn is_retryable_status(status: u16) -> bool {
        status >= 500 || status == 409
    }

    pub fn is_retryable_error(error: &TransportError) -> bool {
        matches!(
            error,
            TransportError::Timeout | TransportError::BodyInterrupted(_)
        )
    }

    /// Sends `request` until it succeeds, fails for good, or attempts run out.
    pub fn run(
        &self,
        transport: &dyn Transport,
        request: &Request,
    ) -> Result<RawResponse, RequestError> {
        let max_attempts = self.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let last = attempt == max_attempts;
            match transport.send(request) {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) if !last && Self::is_retryable_status(response.status) => {
                    log::warn!(
                        "{}: attempt {} returned {}, retrying",
                        request,
                        attempt,
                        response.status
                    );
                }
                Ok(response) => {
                    return Err(RequestError::from_response(
                        request,
                        response.status,
                        &response.body,
                    ))
                }
                Err(err) if !last && Self::is_retryable_error(&err) => {
                    log::warn!("{}: attempt {} failed ({}), retrying", request, attempt, err);
                }
                Err(err) => return Err(RequestError::from_transport(request, err.to_string())),
            }

            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
        }

        Err(RequestError::from_transport(
            request,
            "retry budget exhausted without an attempt",
        ))
    }
}
