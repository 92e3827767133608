//! Credential pool and the retry driver that rotates through it.
//!
//! A file-transcription request carries its own comma-separated list of
//! provider API keys. Every chunk gets a freshly shuffled [`CredentialQueue`]
//! built from that list; each attempt pops one credential and a failed
//! credential is never re-queued for the same chunk.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::error::TranscriptionError;

/// Number of leading characters kept when a credential is logged.
const MASK_PREFIX_LEN: usize = 10;

/// Opaque provider token. Zeroed on drop, masked in `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token, only for building the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Loggable form: the first ten characters followed by `...`.
    pub fn masked(&self) -> String {
        let prefix: String = self.0.chars().take(MASK_PREFIX_LEN).collect();
        format!("{prefix}...")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

/// Immutable, non-empty set of credentials supplied with one request.
#[derive(Debug, Clone)]
pub struct CredentialPool {
    credentials: Arc<[Credential]>,
}

impl CredentialPool {
    pub fn new(credentials: Vec<Credential>) -> Result<Self, TranscriptionError> {
        if credentials.is_empty() {
            return Err(TranscriptionError::InvalidInput(
                "At least one API key is required".to_string(),
            ));
        }
        Ok(Self {
            credentials: credentials.into(),
        })
    }

    /// Parse a comma-separated key list, ignoring blanks and surrounding whitespace.
    pub fn parse(list: &str) -> Result<Self, TranscriptionError> {
        let credentials = list
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(Credential::new)
            .collect();
        Self::new(credentials)
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Fresh random permutation of the pool for one chunk.
    pub fn attempt_queue(&self) -> CredentialQueue {
        self.attempt_queue_with(&mut rand::rng())
    }

    pub fn attempt_queue_with<R: Rng + ?Sized>(&self, rng: &mut R) -> CredentialQueue {
        let mut order = self.credentials.to_vec();
        order.shuffle(rng);
        CredentialQueue {
            remaining: order.into(),
        }
    }

    /// Queue in the order the keys were supplied.
    pub fn ordered_queue(&self) -> CredentialQueue {
        CredentialQueue {
            remaining: self.credentials.iter().cloned().collect(),
        }
    }
}

/// Per-chunk attempt order. Credentials are consumed, never put back.
#[derive(Debug)]
pub struct CredentialQueue {
    remaining: VecDeque<Credential>,
}

impl CredentialQueue {
    pub fn next_credential(&mut self) -> Option<Credential> {
        self.remaining.pop_front()
    }

    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

/// Run `attempt` with successive credentials until one succeeds.
///
/// Stops when the queue is empty or `max_retries` attempts have been made,
/// whichever comes first, and reports how many attempts were made.
pub async fn run_with_rotation<T, E, F, Fut>(
    mut queue: CredentialQueue,
    max_retries: usize,
    mut attempt: F,
) -> Result<T, TranscriptionError>
where
    F: FnMut(Credential, usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempts = 0;
    let mut last_error = None;

    while attempts < max_retries {
        let Some(credential) = queue.next_credential() else {
            break;
        };
        attempts += 1;
        let masked = credential.masked();
        debug!(attempt = attempts, credential = %masked, "Starting attempt");

        match attempt(credential, attempts).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(
                    attempt = attempts,
                    credential = %masked,
                    remaining = queue.remaining(),
                    "Attempt failed, rotating credential: {}",
                    e
                );
                last_error = Some(e.to_string());
            }
        }
    }

    Err(TranscriptionError::Exhausted {
        attempts,
        last_error,
    })
}
