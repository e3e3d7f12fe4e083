use crate::advanced::framer::{frame_for, FrameAction};
use crate::advanced::secp256r1::normalize_signature;
use crate::basic::wallet::TransactionAssembler;
use crate::config::LazorkitConfig;
use crate::core::connection::SolConnection;
use crate::core::constants::DEFAULT_PROGRAM_ID;
use crate::core::signer::SignerSurface;
use crate::core::storage::KeyValueStore;
use crate::dialog::message::SignRequestData;
use crate::dialog::{ChallengeTracker, ChannelConfig, CredentialStore, Message, MessageChannel};
use crate::error::{ChannelError, LazorSdkError, Result};
use crate::types::{Credential, SignedMessage};
use crate::utils::{
    get_list_smart_wallet_authority_by_passkey_pubkey, get_smart_wallet_authority_data,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lazorkit_interface::{PasskeyPubkey, RAW_PASSKEY_SIZE};
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;
use std::str::FromStr;
use std::sync::Arc;

/// Entry point for host applications: connect a passkey, sign with it, and
/// turn signatures into smart wallet transactions.
///
/// The host forwards surface messages to [`Lazorkit::channel`] via
/// `handle_event` or `run`.
#[derive(Debug)]
pub struct Lazorkit {
    config: LazorkitConfig,
    host_origin: String,
    channel: Arc<MessageChannel>,
    credentials: CredentialStore,
    assembler: TransactionAssembler,
    challenges: ChallengeTracker,
    /// Ceremonies in flight; the surface closes when the last one ends
    ceremonies: tokio::sync::Mutex<usize>,
}

impl Lazorkit {
    pub fn new(
        config: LazorkitConfig,
        surface: Arc<dyn SignerSurface>,
        store: Arc<dyn KeyValueStore>,
        host_origin: impl Into<String>,
    ) -> Result<Self> {
        config.validate()?;
        let host_origin = host_origin.into();

        let channel =
            MessageChannel::new(ChannelConfig::from(&config), surface, Some(&host_origin))?;

        let assembler = TransactionAssembler::new(DEFAULT_PROGRAM_ID)
            .with_compute_unit_limit(config.compute_unit_limit);
        if let Some(table) = config.lookup_table()? {
            assembler.set_lookup_table_address(table);
        }

        Ok(Self {
            config,
            host_origin,
            channel: Arc::new(channel),
            credentials: CredentialStore::new(store),
            assembler,
            challenges: ChallengeTracker::default(),
            ceremonies: tokio::sync::Mutex::new(0),
        })
    }

    pub fn config(&self) -> &LazorkitConfig {
        &self.config
    }

    pub fn channel(&self) -> Arc<MessageChannel> {
        Arc::clone(&self.channel)
    }

    pub fn assembler(&self) -> &TransactionAssembler {
        &self.assembler
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn is_connected(&self) -> bool {
        self.credentials.load().is_some()
    }

    pub fn credential(&self) -> Option<Credential> {
        self.credentials.load()
    }

    /// Return the stored credential, or run the connect ceremony and store its result
    #[tracing::instrument(skip(self))]
    pub async fn connect(&self) -> Result<Credential> {
        if let Some(credential) = self.credentials.load() {
            tracing::debug!("reusing stored credential");
            return Ok(credential);
        }
        self.credentials.repair();

        self.begin_ceremony().await?;
        let challenge = self.challenges.issue();
        let request = Message::connect_request(&self.host_origin, challenge.clone());
        let response = self.channel.send(request).await;
        self.end_ceremony().await;

        let data = response?.into_connect_data()?;
        let answered = data.challenge.clone().unwrap_or_else(|| challenge.clone());
        self.challenges.consume(&answered)?;
        if answered != challenge {
            return Err(ChannelError::ChallengeRejected(
                "response answers a different challenge".to_string(),
            )
            .into());
        }

        let credential = Credential::from(data);
        self.credentials.save(&credential);
        tracing::info!("connected credential {}", credential.credential_id);
        Ok(credential)
    }

    /// Ask the connected passkey to sign `message`
    #[tracing::instrument(skip(self, message), fields(len = message.len()))]
    pub async fn sign(&self, message: &[u8]) -> Result<SignedMessage> {
        let credential = self.credentials.load().ok_or(LazorSdkError::NotConnected)?;

        self.begin_ceremony().await?;
        let nonce = uuid::Uuid::new_v4().to_string();
        let request = Message::sign_request(SignRequestData {
            message: STANDARD.encode(message),
            origin: self.host_origin.clone(),
            nonce: nonce.clone(),
            credential_id: Some(credential.credential_id),
            description: None,
        });
        let response = self.channel.send(request).await;
        self.end_ceremony().await;

        let signed = response?.into_signed_message()?;
        if signed.nonce != nonce {
            return Err(ChannelError::InvalidArgument(format!(
                "sign response nonce {} does not match request",
                signed.nonce
            ))
            .into());
        }
        Ok(signed)
    }

    /// Frame `instruction`, have the passkey sign it, and assemble the wallet transaction
    #[tracing::instrument(skip_all, fields(smart_wallet = %smart_wallet))]
    pub async fn sign_instruction(
        &self,
        connection: &impl SolConnection,
        instruction: &Instruction,
        payer: &Pubkey,
        smart_wallet: &Pubkey,
        smart_wallet_authority: &Pubkey,
    ) -> Result<VersionedTransaction> {
        let credential = self.credentials.load().ok_or(LazorSdkError::NotConnected)?;
        let pubkey = raw_public_key(&credential)?;

        let framed = frame_for(
            connection,
            smart_wallet_authority,
            FrameAction::VerifyAndExecute(instruction),
        )
        .await?;
        let signed = self.sign(&framed.bytes).await?;

        self.assembler
            .create_verify_and_execute(
                connection,
                instruction,
                &pubkey,
                &normalize_signature(&signed.signature)?,
                &signed.authenticator_data,
                &signed.client_data_json,
                payer,
                smart_wallet,
                smart_wallet_authority,
            )
            .await
    }

    /// Find the wallet the connected passkey controls and remember it.
    ///
    /// A previously recorded wallet is returned without a lookup. Returns
    /// `None` when no authority record exists for the passkey yet.
    #[tracing::instrument(skip_all)]
    pub async fn resolve_smart_wallet(
        &self,
        connection: &impl SolConnection,
    ) -> Result<Option<Pubkey>> {
        let credential = self.credentials.load().ok_or(LazorSdkError::NotConnected)?;
        if let Some(recorded) = self.credentials.smart_wallet() {
            let address = Pubkey::from_str(&recorded).map_err(|e| {
                LazorSdkError::InvalidAccountData(format!("stored smart wallet: {}", e))
            })?;
            return Ok(Some(address));
        }

        let passkey = PasskeyPubkey::from_bytes(&raw_public_key(&credential)?)?;
        let authorities = get_list_smart_wallet_authority_by_passkey_pubkey(
            connection,
            &self.assembler.program_id,
            &passkey,
        )
        .await?;
        let Some(authority) = authorities.first() else {
            tracing::debug!("no wallet registered for this passkey");
            return Ok(None);
        };

        let smart_wallet = get_smart_wallet_authority_data(connection, authority)
            .await?
            .smart_wallet();
        self.credentials.set_smart_wallet(&smart_wallet.to_string());
        tracing::info!("resolved smart wallet {}", smart_wallet);
        Ok(Some(smart_wallet))
    }

    /// Forget the credential and close the surface
    pub async fn disconnect(&self) {
        self.credentials.clear();
        self.channel.close().await;
        tracing::info!("disconnected");
    }

    async fn begin_ceremony(&self) -> Result<()> {
        let mut active = self.ceremonies.lock().await;
        self.channel.open().await?;
        *active += 1;
        Ok(())
    }

    /// Close the surface unless another ceremony still needs it
    async fn end_ceremony(&self) {
        let mut active = self.ceremonies.lock().await;
        *active = active.saturating_sub(1);
        if *active == 0 {
            self.channel.close().await;
        } else {
            tracing::debug!("{} ceremonies still running, keeping surface open", *active);
        }
    }
}

/// Raw `x || y` key from a stored credential (64 bytes, or 65 with the SEC1 prefix)
fn raw_public_key(credential: &Credential) -> Result<Vec<u8>> {
    let bytes = STANDARD
        .decode(&credential.public_key)
        .map_err(|e| LazorSdkError::InvalidArgument(format!("public key is not base64: {}", e)))?;
    match bytes.len() {
        RAW_PASSKEY_SIZE => Ok(bytes),
        65 if bytes[0] == 0x04 => Ok(bytes[1..].to_vec()),
        len => Err(LazorSdkError::InvalidArgument(format!(
            "stored public key is {} bytes; an uncompressed key is required",
            len
        ))),
    }
}
