//! Passkey public key encodings

use crate::error::InterfaceError;
use crate::{PASSKEY_SIZE, RAW_PASSKEY_SIZE};
use borsh::{BorshDeserialize, BorshSerialize};

/// Compressed SEC1 secp256r1 public key, the form the program stores.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PasskeyPubkey {
    pub data: [u8; PASSKEY_SIZE],
}

impl PasskeyPubkey {
    /// Accepts compressed (33), raw x || y (64) or uncompressed SEC1 (65) keys.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InterfaceError> {
        match bytes.len() {
            PASSKEY_SIZE => {
                if bytes[0] != 0x02 && bytes[0] != 0x03 {
                    return Err(InterfaceError::InvalidPasskeyPrefix(bytes[0]));
                }
                let mut data = [0u8; PASSKEY_SIZE];
                data.copy_from_slice(bytes);
                Ok(Self { data })
            },
            RAW_PASSKEY_SIZE => Ok(Self::compress(bytes)),
            65 => {
                if bytes[0] != 0x04 {
                    return Err(InterfaceError::InvalidPasskeyPrefix(bytes[0]));
                }
                Ok(Self::compress(&bytes[1..]))
            },
            len => Err(InterfaceError::InvalidPasskeyLength(len)),
        }
    }

    /// Compress a raw x || y point. Caller guarantees 64 bytes.
    fn compress(raw: &[u8]) -> Self {
        let (x, y) = raw.split_at(32);
        let mut data = [0u8; PASSKEY_SIZE];
        data[0] = if y[31] & 1 == 0 { 0x02 } else { 0x03 };
        data[1..].copy_from_slice(x);
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8; PASSKEY_SIZE] {
        &self.data
    }
}

impl From<[u8; PASSKEY_SIZE]> for PasskeyPubkey {
    fn from(data: [u8; PASSKEY_SIZE]) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::{SigningKey, VerifyingKey};

    #[test]
    fn test_raw_key_compresses_like_p256() {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let verifying_key = VerifyingKey::from(&signing_key);
        let uncompressed = verifying_key.to_encoded_point(false);
        let compressed = verifying_key.to_encoded_point(true);

        let from_raw = PasskeyPubkey::from_bytes(&uncompressed.as_bytes()[1..]).unwrap();
        let from_sec1 = PasskeyPubkey::from_bytes(uncompressed.as_bytes()).unwrap();
        let from_compressed = PasskeyPubkey::from_bytes(compressed.as_bytes()).unwrap();

        assert_eq!(from_raw.as_bytes().as_slice(), compressed.as_bytes());
        assert_eq!(from_raw, from_sec1);
        assert_eq!(from_raw, from_compressed);
    }

    #[test]
    fn test_rejects_bad_lengths_and_prefixes() {
        assert_eq!(
            PasskeyPubkey::from_bytes(&[2u8; 32]),
            Err(InterfaceError::InvalidPasskeyLength(32))
        );
        assert_eq!(
            PasskeyPubkey::from_bytes(&[5u8; 33]),
            Err(InterfaceError::InvalidPasskeyPrefix(5))
        );
        let mut sec1 = [1u8; 65];
        sec1[0] = 0x02;
        assert_eq!(
            PasskeyPubkey::from_bytes(&sec1),
            Err(InterfaceError::InvalidPasskeyPrefix(2))
        );
    }
}
