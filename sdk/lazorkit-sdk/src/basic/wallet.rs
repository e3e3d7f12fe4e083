use crate::advanced::{instructions, secp256r1};
use crate::core::connection::SolConnection;
use crate::error::{LazorSdkError, Result};
use crate::types::InitTransaction;
use crate::utils;
use lazorkit_interface::{PasskeyPubkey, SmartWalletAuthority, VerifyParam, RAW_PASSKEY_SIZE};
use parking_lot::Mutex;
use solana_sdk::address_lookup_table::AddressLookupTableAccount;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::{v0, Message, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{Transaction, VersionedTransaction};

#[derive(Debug, Default)]
struct LookupTable {
    address: Option<Pubkey>,
    cached: Option<AddressLookupTableAccount>,
}

/// Turns passkey signatures into unsigned smart wallet transactions.
///
/// Nothing here signs or submits; the payer (or a paymaster) does that.
#[derive(Debug)]
pub struct TransactionAssembler {
    /// Program ID of the LazorKit contract
    pub program_id: Pubkey,

    /// Compute unit limit prepended to v0 transactions, if any
    pub compute_unit_limit: Option<u32>,

    lookup_table: Mutex<LookupTable>,
}

impl Default for TransactionAssembler {
    fn default() -> Self {
        Self::new(crate::core::constants::DEFAULT_PROGRAM_ID)
    }
}

impl TransactionAssembler {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            compute_unit_limit: Some(crate::core::constants::DEFAULT_COMPUTE_UNIT_LIMIT),
            lookup_table: Mutex::new(LookupTable::default()),
        }
    }

    pub fn with_compute_unit_limit(mut self, limit: Option<u32>) -> Self {
        self.compute_unit_limit = limit;
        self
    }

    /// Select the lookup table for v0 transactions, discarding any cached contents
    pub fn set_lookup_table_address(&self, address: Pubkey) {
        let mut table = self.lookup_table.lock();
        table.address = Some(address);
        table.cached = None;
    }

    pub fn lookup_table_address(&self) -> Option<Pubkey> {
        self.lookup_table.lock().address
    }

    /// Create a wallet with a random id
    pub fn create_init(&self, passkey: &[u8], payer: &Pubkey) -> Result<InitTransaction> {
        self.create_init_with_id(passkey, payer, rand::random::<u64>())
    }

    pub fn create_init_with_id(
        &self,
        passkey: &[u8],
        payer: &Pubkey,
        id: u64,
    ) -> Result<InitTransaction> {
        let passkey = PasskeyPubkey::from_bytes(passkey)?;
        let (smart_wallet, _) = utils::derive_smart_wallet(&self.program_id, id);
        let (smart_wallet_authority, _) =
            utils::derive_smart_wallet_authority(&self.program_id, &passkey, &smart_wallet);

        let ix = instructions::init_smart_wallet(&self.program_id, payer, passkey, id)?;
        let transaction = Transaction::new_unsigned(Message::new(&[ix], Some(payer)));

        tracing::debug!("init transaction for wallet {} (id {})", smart_wallet, id);
        Ok(InitTransaction {
            transaction,
            smart_wallet,
            smart_wallet_authority,
            id,
        })
    }

    /// Wrap `instruction` so the wallet executes it once the passkey signature verifies.
    ///
    /// `authenticator_data` and `client_data_json` are the raw WebAuthn
    /// assertion fields; the passkey signed `authenticator_data ||
    /// sha256(client_data_json)`.
    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(skip_all, fields(smart_wallet = %smart_wallet))]
    pub async fn create_verify_and_execute(
        &self,
        connection: &impl SolConnection,
        instruction: &Instruction,
        pubkey: &[u8],
        signature: &[u8],
        authenticator_data: &[u8],
        client_data_json: &[u8],
        payer: &Pubkey,
        smart_wallet: &Pubkey,
        smart_wallet_authority: &Pubkey,
    ) -> Result<VersionedTransaction> {
        let table = self.lookup_table_account(connection).await?;
        let verify = self
            .verify_param(
                connection,
                pubkey,
                signature,
                authenticator_data,
                client_data_json,
                smart_wallet,
                smart_wallet_authority,
            )
            .await?;
        let secp_ix =
            secp256r1::build_verify_instruction(&verify.signed_message(), pubkey, signature)?;

        let program_ix = instructions::verify_and_execute(
            &self.program_id,
            payer,
            smart_wallet,
            smart_wallet_authority,
            verify,
            instruction,
        )?;

        self.compile(connection, payer, secp_ix, program_ix, table)
            .await
    }

    /// Register `new_passkey` on the wallet, authorized by the signing passkey
    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(skip_all, fields(smart_wallet = %smart_wallet))]
    pub async fn add_authenticators(
        &self,
        connection: &impl SolConnection,
        pubkey: &[u8],
        signature: &[u8],
        authenticator_data: &[u8],
        client_data_json: &[u8],
        payer: &Pubkey,
        new_passkey: &[u8],
        smart_wallet: &Pubkey,
        smart_wallet_authority: &Pubkey,
    ) -> Result<VersionedTransaction> {
        let table = self.lookup_table_account(connection).await?;
        let new_passkey = PasskeyPubkey::from_bytes(new_passkey)?;
        let verify = self
            .verify_param(
                connection,
                pubkey,
                signature,
                authenticator_data,
                client_data_json,
                smart_wallet,
                smart_wallet_authority,
            )
            .await?;
        let secp_ix =
            secp256r1::build_verify_instruction(&verify.signed_message(), pubkey, signature)?;

        let program_ix = instructions::add_authenticators(
            &self.program_id,
            payer,
            smart_wallet,
            smart_wallet_authority,
            verify,
            new_passkey,
        )?;

        self.compile(connection, payer, secp_ix, program_ix, table)
            .await
    }

    /// Position of the precompile instruction in assembled transactions
    pub fn verify_instruction_index(&self) -> u8 {
        if self.compute_unit_limit.is_some() {
            1
        } else {
            0
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn verify_param(
        &self,
        connection: &impl SolConnection,
        pubkey: &[u8],
        signature: &[u8],
        authenticator_data: &[u8],
        client_data_json: &[u8],
        smart_wallet: &Pubkey,
        smart_wallet_authority: &Pubkey,
    ) -> Result<VerifyParam> {
        if pubkey.len() != RAW_PASSKEY_SIZE {
            return Err(LazorSdkError::InvalidArgument(format!(
                "public key must be {} bytes, got {}",
                RAW_PASSKEY_SIZE,
                pubkey.len()
            )));
        }
        let passkey = PasskeyPubkey::from_bytes(pubkey)?;
        let sig: [u8; 64] = signature.try_into().map_err(|_| {
            LazorSdkError::InvalidArgument(format!(
                "signature must be 64 bytes, got {}",
                signature.len()
            ))
        })?;

        let authority: SmartWalletAuthority =
            utils::get_smart_wallet_authority_data(connection, smart_wallet_authority).await?;
        if authority.smart_wallet() != *smart_wallet {
            return Err(LazorSdkError::InvalidArgument(format!(
                "authority {} belongs to wallet {}",
                smart_wallet_authority,
                authority.smart_wallet()
            )));
        }
        if authority.passkey_pubkey != passkey {
            return Err(LazorSdkError::InvalidArgument(format!(
                "authority {} is not bound to this passkey",
                smart_wallet_authority
            )));
        }

        Ok(VerifyParam {
            pubkey: passkey,
            client_data_json_raw: client_data_json.to_vec(),
            authenticator_data_raw: authenticator_data.to_vec(),
            sig,
            verify_instruction_index: self.verify_instruction_index(),
        })
    }

    async fn lookup_table_account(
        &self,
        connection: &impl SolConnection,
    ) -> Result<AddressLookupTableAccount> {
        let address = {
            let table = self.lookup_table.lock();
            if let Some(cached) = &table.cached {
                return Ok(cached.clone());
            }
            table.address.ok_or(LazorSdkError::LookupTableUnset)?
        };

        let data = utils::fetch_account_data(connection, &address).await?;
        let account = AddressLookupTableAccount {
            key: address,
            addresses: utils::parse_lookup_table_addresses(&data)?,
        };
        tracing::debug!(
            "cached lookup table {} with {} addresses",
            address,
            account.addresses.len()
        );

        let mut table = self.lookup_table.lock();
        // Keep the result only if the address was not changed meanwhile.
        if table.address == Some(address) {
            table.cached = Some(account.clone());
        }
        Ok(account)
    }

    async fn compile(
        &self,
        connection: &impl SolConnection,
        payer: &Pubkey,
        secp_ix: Instruction,
        program_ix: Instruction,
        table: AddressLookupTableAccount,
    ) -> Result<VersionedTransaction> {
        let mut ixs = Vec::with_capacity(3);
        if let Some(limit) = self.compute_unit_limit {
            ixs.push(ComputeBudgetInstruction::set_compute_unit_limit(limit));
        }
        ixs.push(secp_ix);
        ixs.push(program_ix);

        let recent_blockhash = connection
            .get_latest_blockhash()
            .await
            .map_err(|e| LazorSdkError::RpcError(e.to_string()))?;

        let message = v0::Message::try_compile(payer, &ixs, &[table], recent_blockhash)?;
        let signatures =
            vec![Signature::default(); message.header.num_required_signatures as usize];

        Ok(VersionedTransaction {
            signatures,
            message: VersionedMessage::V0(message),
        })
    }
}
