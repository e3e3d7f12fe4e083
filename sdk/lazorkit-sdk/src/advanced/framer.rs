//! Canonical message frames signed by passkeys.
//!
//! A frame binds the authority's current nonce to one action and, for
//! actions carrying a payload, to a hash of that payload. Frames contain no
//! clock input: the same authority, nonce and action always frame to the
//! same bytes.

use crate::core::connection::SolConnection;
use crate::error::Result;
use crate::utils::get_smart_wallet_authority_data;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use lazorkit_interface::{Message, MessageAction, PasskeyPubkey};
use sha2::{Digest, Sha256};
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;

/// What a frame authorizes.
#[derive(Debug, Clone, Copy)]
pub enum FrameAction<'a> {
    Init,
    VerifyAndExecute(&'a Instruction),
    AddAuthenticator(&'a PasskeyPubkey),
}

impl FrameAction<'_> {
    pub fn action(&self) -> MessageAction {
        match self {
            FrameAction::Init => MessageAction::Init,
            FrameAction::VerifyAndExecute(_) => MessageAction::VerifyAndExecute,
            FrameAction::AddAuthenticator(_) => MessageAction::AddAuthenticator,
        }
    }

    pub fn instruction_hash(&self) -> [u8; 32] {
        match self {
            FrameAction::Init => [0u8; 32],
            FrameAction::VerifyAndExecute(ix) => instruction_hash(ix),
            FrameAction::AddAuthenticator(passkey) => Sha256::digest(passkey.as_bytes()).into(),
        }
    }
}

/// sha256(program_id || data || account keys...)
pub fn instruction_hash(ix: &Instruction) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(ix.program_id.as_ref());
    hasher.update(&ix.data);
    for meta in &ix.accounts {
        hasher.update(meta.pubkey.as_ref());
    }
    hasher.finalize().into()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedMessage {
    pub message: Message,
    pub bytes: Vec<u8>,
}

impl FramedMessage {
    /// Frame encoded for a sign request (base64url, unpadded)
    pub fn challenge(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.bytes)
    }
}

pub fn frame(
    nonce: u64,
    smart_wallet_authority: &Pubkey,
    action: FrameAction<'_>,
) -> Result<FramedMessage> {
    let message = Message {
        nonce,
        smart_wallet_authority: smart_wallet_authority.to_bytes(),
        action: action.action(),
        instruction_hash: action.instruction_hash(),
    };
    let bytes = message.to_bytes()?;
    Ok(FramedMessage { message, bytes })
}

/// Frame `action` at the authority's current on-chain nonce.
///
/// `Init` frames use nonce 0 without a lookup, since the authority does not
/// exist yet.
pub async fn frame_for(
    connection: &impl SolConnection,
    smart_wallet_authority: &Pubkey,
    action: FrameAction<'_>,
) -> Result<FramedMessage> {
    let nonce = match action {
        FrameAction::Init => 0,
        _ => {
            get_smart_wallet_authority_data(connection, smart_wallet_authority)
                .await?
                .nonce
        },
    };
    tracing::debug!("framing {:?} at nonce {}", action.action(), nonce);
    frame(nonce, smart_wallet_authority, action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::instruction::AccountMeta;

    fn business_ix() -> Instruction {
        Instruction {
            program_id: Pubkey::new_from_array([1u8; 32]),
            accounts: vec![
                AccountMeta::new(Pubkey::new_from_array([2u8; 32]), false),
                AccountMeta::new_readonly(Pubkey::new_from_array([3u8; 32]), false),
            ],
            data: vec![4, 5],
        }
    }

    #[test]
    fn test_same_inputs_same_bytes() {
        let authority = Pubkey::new_unique();
        let ix = business_ix();
        let a = frame(7, &authority, FrameAction::VerifyAndExecute(&ix)).unwrap();
        let b = frame(7, &authority, FrameAction::VerifyAndExecute(&ix)).unwrap();
        assert_eq!(a.bytes, b.bytes);
        assert_eq!(a.challenge(), b.challenge());
    }

    #[test]
    fn test_nonce_and_action_change_bytes() {
        let authority = Pubkey::new_unique();
        let ix = business_ix();
        let base = frame(7, &authority, FrameAction::VerifyAndExecute(&ix)).unwrap();
        let next = frame(8, &authority, FrameAction::VerifyAndExecute(&ix)).unwrap();
        assert_ne!(base.bytes, next.bytes);
        assert_ne!(base.bytes, frame(7, &authority, FrameAction::Init).unwrap().bytes);

        let mut other = business_ix();
        other.data.push(6);
        let changed = frame(7, &authority, FrameAction::VerifyAndExecute(&other)).unwrap();
        assert_ne!(base.bytes, changed.bytes);
    }

    #[test]
    fn test_frame_layout() {
        let authority = Pubkey::new_unique();
        let ix = business_ix();
        let framed = frame(0x0102, &authority, FrameAction::VerifyAndExecute(&ix)).unwrap();

        let mut preimage = vec![1u8; 32];
        preimage.extend_from_slice(&[4, 5]);
        preimage.extend_from_slice(&[2u8; 32]);
        preimage.extend_from_slice(&[3u8; 32]);
        let expected_hash: [u8; 32] = Sha256::digest(&preimage).into();

        assert_eq!(framed.bytes.len(), Message::LEN);
        assert_eq!(&framed.bytes[..8], &0x0102u64.to_le_bytes());
        assert_eq!(&framed.bytes[8..40], authority.as_ref());
        assert_eq!(framed.bytes[40], MessageAction::VerifyAndExecute as u8);
        assert_eq!(&framed.bytes[41..], &expected_hash);
    }

    #[test]
    fn test_challenge_is_url_safe() {
        let authority = Pubkey::new_from_array([0xff; 32]);
        let framed = frame(u64::MAX, &authority, FrameAction::Init).unwrap();
        let challenge = framed.challenge();
        assert!(!challenge.contains('+') && !challenge.contains('/') && !challenge.contains('='));
        assert_eq!(URL_SAFE_NO_PAD.decode(challenge).unwrap(), framed.bytes);
    }
}
