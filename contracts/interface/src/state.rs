//! Account layouts read by clients, and the message frame passkeys sign.

use crate::error::InterfaceError;
use crate::passkey::PasskeyPubkey;
use crate::PASSKEY_SIZE;
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

/// Authority record binding one passkey to one smart wallet.
///
/// PDA Seeds: ["smart_wallet_authority", sha256(passkey || smart_wallet)]
///
/// Layout after the 8-byte Anchor discriminator:
/// ```text
/// [0..33]  passkey_pubkey
/// [33..65] smart_wallet
/// [65..73] nonce (u64 LE)
/// [73]     bump
/// ```
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct SmartWalletAuthority {
    pub passkey_pubkey: PasskeyPubkey,
    pub smart_wallet: [u8; 32],
    /// Advances every time a signed message is consumed
    pub nonce: u64,
    pub bump: u8,
}

impl SmartWalletAuthority {
    /// sha256("account:SmartWalletAuthority")[..8]
    pub const DISCRIMINATOR: [u8; 8] = [164, 179, 94, 28, 254, 200, 86, 148];

    /// 8 + 33 + 32 + 8 + 1
    pub const LEN: usize = 82;

    /// Offset of `passkey_pubkey` within the raw account, used by memcmp filters
    pub const PASSKEY_OFFSET: usize = 8;

    pub fn smart_wallet(&self) -> Pubkey {
        Pubkey::new_from_array(self.smart_wallet)
    }

    pub fn unpack(data: &[u8]) -> Result<Self, InterfaceError> {
        if data.len() < Self::LEN {
            return Err(InterfaceError::AccountDataTooSmall {
                expected: Self::LEN,
                actual: data.len(),
            });
        }
        let mut discriminator = [0u8; 8];
        discriminator.copy_from_slice(&data[..8]);
        if discriminator != Self::DISCRIMINATOR {
            return Err(InterfaceError::UnknownDiscriminator(discriminator));
        }
        Self::deserialize(&mut &data[8..Self::LEN])
            .map_err(|_| InterfaceError::InvalidInstructionData)
    }

    /// Raw account bytes, as the program would write them
    pub fn pack(&self) -> std::io::Result<Vec<u8>> {
        let mut data = Vec::with_capacity(Self::LEN);
        data.extend_from_slice(&Self::DISCRIMINATOR);
        self.serialize(&mut data)?;
        Ok(data)
    }
}

/// What a signed message authorizes.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum MessageAction {
    Init = 0,
    VerifyAndExecute = 1,
    AddAuthenticator = 2,
}

/// Canonical frame a passkey signs.
///
/// The program rejects a frame whose nonce does not equal the authority's
/// current nonce, so each frame is single use.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub nonce: u64,
    pub smart_wallet_authority: [u8; 32],
    pub action: MessageAction,
    pub instruction_hash: [u8; 32],
}

impl Message {
    /// 8 + 32 + 1 + 32
    pub const LEN: usize = 73;

    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        borsh::to_vec(self)
    }
}
