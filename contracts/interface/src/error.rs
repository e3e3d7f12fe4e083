//! Interface decoding errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("Invalid passkey length: {0} bytes")]
    InvalidPasskeyLength(usize),

    #[error("Invalid passkey encoding prefix: {0:#04x}")]
    InvalidPasskeyPrefix(u8),

    #[error("Unknown discriminator: {0:?}")]
    UnknownDiscriminator([u8; 8]),

    #[error("Account data too small: expected {expected}, got {actual}")]
    AccountDataTooSmall { expected: usize, actual: usize },

    #[error("Invalid instruction data")]
    InvalidInstructionData,
}
