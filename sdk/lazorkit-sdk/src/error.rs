use lazorkit_interface::InterfaceError;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Errors surfaced by the dialog protocol (channel and correlator)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// Channel not open, closed while the request was pending, or destroyed
    #[error("Channel closed")]
    ChannelClosed,

    /// No response arrived within the request's timeout
    #[error("Request timed out")]
    Timeout,

    /// The signer surface answered with an error payload
    #[error("Signer error {code}: {message}")]
    SignerError { code: String, message: String },

    /// The host could not provide an embedded frame or a popup
    #[error("Signer surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Connect challenge unknown, already used, or past its expiry
    #[error("Challenge rejected: {0}")]
    ChallengeRejected(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Credential store errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// Exactly one half of the credential pair is present
    #[error("Inconsistent credential storage: {present} present without {missing}")]
    Inconsistent {
        present: &'static str,
        missing: &'static str,
    },
}

/// SDK-specific error types for LazorKit operations
#[derive(Debug, Error)]
pub enum LazorSdkError {
    /// Connection or RPC error
    #[error("RPC error: {0}")]
    RpcError(String),

    /// Account not found on-chain
    #[error("Account not found: {0}")]
    AccountNotFound(Pubkey),

    /// Invalid account data or deserialization error
    #[error("Invalid account data: {0}")]
    InvalidAccountData(String),

    /// Bad input: key lengths, mismatched authority, oversized message
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A versioned transaction was requested before a lookup table was configured
    #[error("Address lookup table not set")]
    LookupTableUnset,

    /// Borsh serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] std::io::Error),

    /// v0 message compilation failed
    #[error("Failed to compile message: {0}")]
    Compile(#[from] solana_sdk::message::CompileError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// Wallet not connected
    #[error("Not connected")]
    NotConnected,
}

impl From<InterfaceError> for LazorSdkError {
    fn from(err: InterfaceError) -> Self {
        match err {
            InterfaceError::InvalidPasskeyLength(_) | InterfaceError::InvalidPasskeyPrefix(_) => {
                LazorSdkError::InvalidArgument(err.to_string())
            },
            _ => LazorSdkError::InvalidAccountData(err.to_string()),
        }
    }
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, LazorSdkError>;
