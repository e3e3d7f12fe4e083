use crate::core::constants::{CREDENTIAL_ID_KEY, PUBLIC_KEY_KEY, SMART_WALLET_ADDRESS_KEY};
use crate::core::storage::KeyValueStore;
use crate::error::CredentialError;
use crate::types::Credential;
use std::sync::Arc;

/// Persists the connected passkey credential in host storage.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Overwrites any previous credential
    pub fn save(&self, credential: &Credential) {
        self.store.set(CREDENTIAL_ID_KEY, &credential.credential_id);
        self.store.set(PUBLIC_KEY_KEY, &credential.public_key);
    }

    /// The stored credential, or None when either half is missing
    pub fn load(&self) -> Option<Credential> {
        self.load_checked().ok().flatten()
    }

    /// Like `load`, but reports a half-written pair
    pub fn load_checked(&self) -> Result<Option<Credential>, CredentialError> {
        match (
            self.store.get(CREDENTIAL_ID_KEY),
            self.store.get(PUBLIC_KEY_KEY),
        ) {
            (Some(credential_id), Some(public_key)) => Ok(Some(Credential {
                credential_id,
                public_key,
            })),
            (None, None) => Ok(None),
            (Some(_), None) => Err(CredentialError::Inconsistent {
                present: CREDENTIAL_ID_KEY,
                missing: PUBLIC_KEY_KEY,
            }),
            (None, Some(_)) => Err(CredentialError::Inconsistent {
                present: PUBLIC_KEY_KEY,
                missing: CREDENTIAL_ID_KEY,
            }),
        }
    }

    /// Clear a half-written pair. Returns true if anything was removed.
    pub fn repair(&self) -> bool {
        match self.load_checked() {
            Err(err) => {
                tracing::warn!("repairing credential storage: {}", err);
                self.store.remove(CREDENTIAL_ID_KEY);
                self.store.remove(PUBLIC_KEY_KEY);
                true
            },
            Ok(_) => false,
        }
    }

    pub fn set_smart_wallet(&self, address: &str) {
        self.store.set(SMART_WALLET_ADDRESS_KEY, address);
    }

    pub fn smart_wallet(&self) -> Option<String> {
        self.store.get(SMART_WALLET_ADDRESS_KEY)
    }

    pub fn clear(&self) {
        self.store.remove(CREDENTIAL_ID_KEY);
        self.store.remove(PUBLIC_KEY_KEY);
        self.store.remove(SMART_WALLET_ADDRESS_KEY);
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}
