//! Smart Wallet Instruction Definitions
//!
//! The program is built with Anchor, so every instruction is encoded as an
//! 8-byte discriminator (`sha256("global:<name>")[..8]`) followed by the
//! borsh-encoded arguments.

use crate::error::InterfaceError;
use crate::passkey::PasskeyPubkey;
use crate::SIGNATURE_SIZE;
use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};

/// Proof that the passkey signed a WebAuthn assertion, checked against the
/// secp256r1 precompile instruction at `verify_instruction_index`.
///
/// The raw clientDataJSON is carried so the program can read the challenge
/// (the base64url frame) and check its nonce against the authority record.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct VerifyParam {
    pub pubkey: PasskeyPubkey,
    pub client_data_json_raw: Vec<u8>,
    pub authenticator_data_raw: Vec<u8>,
    pub sig: [u8; SIGNATURE_SIZE],
    pub verify_instruction_index: u8,
}

impl VerifyParam {
    /// authenticatorData || sha256(clientDataJSON), the bytes the precompile verifies
    pub fn signed_message(&self) -> Vec<u8> {
        let mut message = Vec::with_capacity(self.authenticator_data_raw.len() + 32);
        message.extend_from_slice(&self.authenticator_data_raw);
        message.extend_from_slice(&Sha256::digest(&self.client_data_json_raw));
        message
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmartWalletInstruction {
    /// Create a smart wallet and its first authority record
    ///
    /// Accounts:
    /// 0. `[writable, signer]` Payer
    /// 1. `[writable]` Smart wallet (PDA: ["smart_wallet", id])
    /// 2. `[writable]` Smart wallet authority (PDA: ["smart_wallet_authority", hash])
    /// 3. `[]` System program
    InitSmartWallet { pubkey: PasskeyPubkey, id: u64 },

    /// Verify a passkey signature, then CPI into `cpi_program` as the wallet
    ///
    /// Accounts:
    /// 0. `[writable, signer]` Payer
    /// 1. `[]` Instructions sysvar
    /// 2. `[writable]` Smart wallet
    /// 3. `[writable]` Smart wallet authority (nonce is advanced)
    /// 4. `[]` CPI program
    /// 5+ `[]` CPI accounts (remaining accounts)
    VerifyAndExecuteInstruction { verify: VerifyParam, data: Vec<u8> },

    /// Verify a passkey signature, then register another passkey on the wallet
    ///
    /// Accounts:
    /// 0. `[writable, signer]` Payer
    /// 1. `[]` Instructions sysvar
    /// 2. `[writable]` Smart wallet
    /// 3. `[writable]` Smart wallet authority of the signing passkey
    /// 4. `[writable]` New smart wallet authority
    /// 5. `[]` System program
    AddAuthenticators {
        verify: VerifyParam,
        new_passkey: PasskeyPubkey,
    },
}

impl SmartWalletInstruction {
    pub const INIT_SMART_WALLET: [u8; 8] = [229, 38, 158, 24, 6, 73, 94, 101];
    pub const VERIFY_AND_EXECUTE_INSTRUCTION: [u8; 8] = [176, 115, 52, 53, 201, 172, 69, 70];
    pub const ADD_AUTHENTICATORS: [u8; 8] = [62, 189, 160, 138, 43, 76, 198, 42];

    pub fn discriminator(&self) -> [u8; 8] {
        match self {
            Self::InitSmartWallet { .. } => Self::INIT_SMART_WALLET,
            Self::VerifyAndExecuteInstruction { .. } => Self::VERIFY_AND_EXECUTE_INSTRUCTION,
            Self::AddAuthenticators { .. } => Self::ADD_AUTHENTICATORS,
        }
    }

    pub fn pack(&self) -> std::io::Result<Vec<u8>> {
        let mut data = self.discriminator().to_vec();
        match self {
            Self::InitSmartWallet { pubkey, id } => {
                pubkey.serialize(&mut data)?;
                id.serialize(&mut data)?;
            },
            Self::VerifyAndExecuteInstruction { verify, data: cpi } => {
                verify.serialize(&mut data)?;
                cpi.serialize(&mut data)?;
            },
            Self::AddAuthenticators {
                verify,
                new_passkey,
            } => {
                verify.serialize(&mut data)?;
                new_passkey.serialize(&mut data)?;
            },
        }
        Ok(data)
    }

    pub fn unpack(input: &[u8]) -> Result<Self, InterfaceError> {
        if input.len() < 8 {
            return Err(InterfaceError::InvalidInstructionData);
        }
        let (tag, rest) = input.split_at(8);
        let mut discriminator = [0u8; 8];
        discriminator.copy_from_slice(tag);

        let invalid = |_| InterfaceError::InvalidInstructionData;
        match discriminator {
            Self::INIT_SMART_WALLET => {
                let (pubkey, id) = <(PasskeyPubkey, u64)>::try_from_slice(rest).map_err(invalid)?;
                Ok(Self::InitSmartWallet { pubkey, id })
            },
            Self::VERIFY_AND_EXECUTE_INSTRUCTION => {
                let (verify, data) =
                    <(VerifyParam, Vec<u8>)>::try_from_slice(rest).map_err(invalid)?;
                Ok(Self::VerifyAndExecuteInstruction { verify, data })
            },
            Self::ADD_AUTHENTICATORS => {
                let (verify, new_passkey) =
                    <(VerifyParam, PasskeyPubkey)>::try_from_slice(rest).map_err(invalid)?;
                Ok(Self::AddAuthenticators {
                    verify,
                    new_passkey,
                })
            },
            other => Err(InterfaceError::UnknownDiscriminator(other)),
        }
    }
}
