//! Connect challenges issued by the host, each accepted at most once.

use crate::error::ChannelError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// How long an issued challenge stays acceptable
pub const CHALLENGE_EXPIRY: Duration = Duration::from_secs(5 * 60);

#[derive(Debug)]
struct Issued {
    issued_at: Instant,
    used: bool,
}

#[derive(Debug)]
pub struct ChallengeTracker {
    expiry: Duration,
    issued: Mutex<HashMap<String, Issued>>,
}

impl Default for ChallengeTracker {
    fn default() -> Self {
        Self::new(CHALLENGE_EXPIRY)
    }
}

impl ChallengeTracker {
    pub fn new(expiry: Duration) -> Self {
        Self {
            expiry,
            issued: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh 32-byte challenge, base64url encoded
    pub fn issue(&self) -> String {
        let challenge = URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>());
        let mut issued = self.issued.lock();
        self.prune(&mut issued);
        issued.insert(
            challenge.clone(),
            Issued {
                issued_at: Instant::now(),
                used: false,
            },
        );
        tracing::debug!("issued challenge ({} tracked)", issued.len());
        challenge
    }

    /// Accept `challenge` once. Unknown, reused and expired challenges fail.
    pub fn consume(&self, challenge: &str) -> Result<(), ChannelError> {
        let mut issued = self.issued.lock();
        let entry = issued
            .get_mut(challenge)
            .ok_or_else(|| ChannelError::ChallengeRejected("unknown challenge".to_string()))?;

        if entry.used {
            tracing::warn!("challenge reused");
            return Err(ChannelError::ChallengeRejected(
                "challenge already used".to_string(),
            ));
        }
        if entry.issued_at.elapsed() <= self.expiry {
            entry.used = true;
            return Ok(());
        }

        issued.remove(challenge);
        tracing::warn!("challenge expired");
        Err(ChannelError::ChallengeRejected("challenge expired".to_string()))
    }

    /// Number of challenges still tracked, used ones included
    pub fn len(&self) -> usize {
        self.issued.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune(&self, issued: &mut HashMap<String, Issued>) {
        let before = issued.len();
        issued.retain(|_, entry| entry.issued_at.elapsed() <= self.expiry);
        let removed = before - issued.len();
        if removed > 0 {
            tracing::debug!("dropped {} expired challenges", removed);
        }
    }
}
