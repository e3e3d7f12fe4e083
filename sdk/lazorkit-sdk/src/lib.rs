//! LazorKit passkey SDK
//!
//! Connects a platform passkey through an isolated signer surface and turns
//! its signatures into smart wallet transactions.

pub mod advanced;
pub mod basic;
pub mod config;
pub mod core;
pub mod dialog;
pub mod error;
pub mod types;
pub mod utils;

pub use crate::basic::client::Lazorkit;
pub use crate::basic::wallet::TransactionAssembler;
pub use crate::config::{ConfigError, DialogMode, LazorkitConfig};
pub use crate::core::connection::{MemcmpFilter, SolConnection};
pub use crate::core::signer::{SignerSurface, SurfaceKind};
pub use crate::core::storage::{KeyValueStore, MemoryStore};
pub use crate::dialog::{
    CredentialStore, InboundEvent, MessageChannel, OriginValidator, RequestCorrelator,
};
pub use crate::error::{ChannelError, CredentialError, LazorSdkError, Result};
pub use crate::types::{Credential, InitTransaction, SignedMessage};
pub use crate::utils::{
    derive_smart_wallet, derive_smart_wallet_authority,
    get_list_smart_wallet_authority_by_passkey_pubkey, get_smart_wallet_authority_data,
};

pub mod state {
    pub use lazorkit_interface::{Message, MessageAction, PasskeyPubkey, SmartWalletAuthority};
}
