//! LazorKit Smart Wallet Interface
//!
//! Client-side view of the passkey smart wallet program: program ids, PDA
//! seeds, instruction encoding and the account layouts the SDK reads.

pub mod error;
pub mod instruction;
pub mod passkey;
pub mod state;

pub use error::InterfaceError;
pub use instruction::{SmartWalletInstruction, VerifyParam};
pub use passkey::PasskeyPubkey;
pub use state::{Message, MessageAction, SmartWalletAuthority};

use solana_program::pubkey::Pubkey;

solana_program::declare_id!("7A4H6t6GfKjQv5xHka66PDfnWAFuon62Jv6fceGcjQZc");

/// Native secp256r1 signature verification precompile
pub const SECP256R1_PROGRAM_ID: Pubkey =
    solana_program::pubkey!("Secp256r1SigVerify1111111111111111111111111");

/// PDA seed for the smart wallet vault: ["smart_wallet", id.to_le_bytes()]
pub const SMART_WALLET_SEED: &[u8] = b"smart_wallet";

/// PDA seed for an authority record: ["smart_wallet_authority", sha256(passkey || wallet)]
pub const SMART_WALLET_AUTHORITY_SEED: &[u8] = b"smart_wallet_authority";

/// Compressed secp256r1 public key size as stored on chain
pub const PASSKEY_SIZE: usize = 33;

/// Raw (x || y) secp256r1 public key size
pub const RAW_PASSKEY_SIZE: usize = 64;

/// Compact r || s signature size
pub const SIGNATURE_SIZE: usize = 64;
