use crate::core::connection::{MemcmpFilter, SolConnection};
use crate::error::{LazorSdkError, Result};
use lazorkit_interface::{
    PasskeyPubkey, SmartWalletAuthority, SMART_WALLET_AUTHORITY_SEED, SMART_WALLET_SEED,
};
use sha2::{Digest, Sha256};
use solana_sdk::address_lookup_table::state::AddressLookupTable;
use solana_sdk::pubkey::Pubkey;

//=============================================================================
// PDA Derivation Helpers
//=============================================================================

/// Derive the smart wallet vault PDA from program ID and wallet id
pub fn derive_smart_wallet(program_id: &Pubkey, id: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[SMART_WALLET_SEED, &id.to_le_bytes()], program_id)
}

/// sha256(passkey || smart_wallet), the variable seed of an authority PDA
pub fn hash_seeds(passkey: &PasskeyPubkey, smart_wallet: &Pubkey) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(passkey.as_bytes());
    hasher.update(smart_wallet.as_ref());
    hasher.finalize().into()
}

/// Derive the authority PDA binding `passkey` to `smart_wallet`
pub fn derive_smart_wallet_authority(
    program_id: &Pubkey,
    passkey: &PasskeyPubkey,
    smart_wallet: &Pubkey,
) -> (Pubkey, u8) {
    let hash = hash_seeds(passkey, smart_wallet);
    Pubkey::find_program_address(&[SMART_WALLET_AUTHORITY_SEED, &hash], program_id)
}

//=============================================================================
// Account Fetching & Parsing
//=============================================================================

/// Fetch raw account data from the blockchain
pub async fn fetch_account_data(
    connection: &impl SolConnection,
    address: &Pubkey,
) -> Result<Vec<u8>> {
    let account = connection
        .get_account(address)
        .await
        .map_err(|e| LazorSdkError::RpcError(e.to_string()))?
        .ok_or(LazorSdkError::AccountNotFound(*address))?;

    Ok(account.data)
}

/// Fetch and decode an authority record by address
pub async fn get_smart_wallet_authority_data(
    connection: &impl SolConnection,
    address: &Pubkey,
) -> Result<SmartWalletAuthority> {
    let data = fetch_account_data(connection, address).await?;
    Ok(SmartWalletAuthority::unpack(&data)?)
}

/// All authority records registered for `passkey`, across wallets
#[tracing::instrument(skip(connection, passkey))]
pub async fn get_list_smart_wallet_authority_by_passkey_pubkey(
    connection: &impl SolConnection,
    program_id: &Pubkey,
    passkey: &PasskeyPubkey,
) -> Result<Vec<Pubkey>> {
    let filters = [
        MemcmpFilter::new(0, SmartWalletAuthority::DISCRIMINATOR.to_vec()),
        MemcmpFilter::new(SmartWalletAuthority::PASSKEY_OFFSET, passkey.as_bytes().to_vec()),
    ];

    let accounts = connection
        .get_program_accounts(program_id, &filters)
        .await
        .map_err(|e| LazorSdkError::RpcError(e.to_string()))?;

    tracing::debug!("found {} authority records", accounts.len());
    Ok(accounts.into_iter().map(|(address, _)| address).collect())
}

/// Parse the address list out of an address lookup table account
pub fn parse_lookup_table_addresses(data: &[u8]) -> Result<Vec<Pubkey>> {
    let table = AddressLookupTable::deserialize(data).map_err(|e| {
        LazorSdkError::InvalidAccountData(format!("Account is not a lookup table: {}", e))
    })?;
    Ok(table.addresses.into_owned())
}
