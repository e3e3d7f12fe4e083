use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::Transaction;

/// Passkey credential returned by a successful connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// WebAuthn credential id, base64
    pub credential_id: String,

    /// Passkey public key, base64
    pub public_key: String,
}

/// Passkey assertion over a framed message, ready for the assembler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMessage {
    /// The framed bytes the caller asked to sign
    pub message: Vec<u8>,

    /// Nonce echoed by the signer surface
    pub nonce: String,

    /// Raw clientDataJSON
    pub client_data_json: Vec<u8>,

    /// sha256(clientDataJSON)
    pub client_data_digest: [u8; 32],

    /// Compact r || s signature
    pub signature: [u8; 64],

    pub authenticator_data: Vec<u8>,

    /// Signing time reported by the surface (ms since epoch)
    pub timestamp: u64,
}

impl SignedMessage {
    /// Bytes the authenticator actually signed: authenticatorData || sha256(clientDataJSON)
    pub fn verification_message(&self) -> Vec<u8> {
        let mut message = Vec::with_capacity(self.authenticator_data.len() + 32);
        message.extend_from_slice(&self.authenticator_data);
        message.extend_from_slice(&self.client_data_digest);
        message
    }
}

/// Unsigned wallet creation transaction and the addresses it creates
#[derive(Debug, Clone)]
pub struct InitTransaction {
    pub transaction: Transaction,

    /// Smart wallet vault PDA
    pub smart_wallet: Pubkey,

    /// Authority record PDA for the creating passkey
    pub smart_wallet_authority: Pubkey,

    /// Wallet id used in the vault seeds
    pub id: u64,
}
