use solana_sdk::pubkey::Pubkey;

// Mainnet deployment of the smart wallet program
pub const DEFAULT_PROGRAM_ID: Pubkey = lazorkit_interface::ID;

pub const DEFAULT_DIALOG_URL: &str = "https://dialog.lazor.io";
pub const DEFAULT_PAYMASTER_URL: &str = "https://paymaster.lazor.io";
pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 200_000;

// Wire protocol
pub const PROTOCOL_VERSION: &str = "1.0";

// Host key-value storage
pub const CREDENTIAL_ID_KEY: &str = "CREDENTIAL_ID";
pub const PUBLIC_KEY_KEY: &str = "PUBLIC_KEY";
pub const SMART_WALLET_ADDRESS_KEY: &str = "SMART_WALLET_ADDRESS";
