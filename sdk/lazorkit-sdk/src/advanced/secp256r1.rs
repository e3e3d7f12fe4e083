//! secp256r1 precompile instruction
//!
//! The layout comes from `solana_secp256r1_program`: a one-entry offset
//! table, then the compressed key, the `r || s` signature and the message,
//! all referring to the instruction's own data.

use crate::error::{LazorSdkError, Result};
use lazorkit_interface::{PasskeyPubkey, RAW_PASSKEY_SIZE, SIGNATURE_SIZE};
use p256::ecdsa::Signature;
use solana_sdk::instruction::Instruction;
use solana_secp256r1_program::{
    new_secp256r1_instruction_with_signature, COMPRESSED_PUBKEY_SERIALIZED_SIZE, DATA_START,
    SIGNATURE_SERIALIZED_SIZE,
};

/// Largest message that fits the u16 offset table
pub const MAX_MESSAGE_SIZE: usize =
    u16::MAX as usize - DATA_START - COMPRESSED_PUBKEY_SERIALIZED_SIZE - SIGNATURE_SERIALIZED_SIZE;

/// Build a precompile instruction verifying `signature` by `pubkey` over `message`.
///
/// `pubkey` is the raw 64-byte `x || y` point and `signature` the 64-byte
/// `r || s` form. The precompile rejects high-S signatures; see
/// [`normalize_signature`].
pub fn build_verify_instruction(
    message: &[u8],
    pubkey: &[u8],
    signature: &[u8],
) -> Result<Instruction> {
    if pubkey.len() != RAW_PASSKEY_SIZE {
        return Err(LazorSdkError::InvalidArgument(format!(
            "public key must be {} bytes, got {}",
            RAW_PASSKEY_SIZE,
            pubkey.len()
        )));
    }
    let signature: &[u8; SIGNATURE_SERIALIZED_SIZE] = signature.try_into().map_err(|_| {
        LazorSdkError::InvalidArgument(format!(
            "signature must be {} bytes, got {}",
            SIGNATURE_SIZE,
            signature.len()
        ))
    })?;
    if message.len() > MAX_MESSAGE_SIZE {
        return Err(LazorSdkError::InvalidArgument(format!(
            "message of {} bytes exceeds {}",
            message.len(),
            MAX_MESSAGE_SIZE
        )));
    }

    let compressed = PasskeyPubkey::from_bytes(pubkey)?;
    Ok(new_secp256r1_instruction_with_signature(
        message,
        signature,
        &compressed.data,
    ))
}

/// Replace `s` with `n - s` when `s > n / 2`.
///
/// Fails when `r` or `s` is not a valid non-zero scalar.
pub fn normalize_signature(signature: &[u8; SIGNATURE_SIZE]) -> Result<[u8; SIGNATURE_SIZE]> {
    let parsed = Signature::from_slice(signature)
        .map_err(|e| LazorSdkError::InvalidArgument(format!("invalid signature: {}", e)))?;
    let normalized = parsed.normalize_s().unwrap_or(parsed);

    let mut out = [0u8; SIGNATURE_SIZE];
    out.copy_from_slice(&normalized.to_bytes());
    Ok(out)
}
