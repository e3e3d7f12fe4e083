#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use lazorkit_sdk::core::connection::{MemcmpFilter, SolConnection};
use lazorkit_sdk::core::signer::{SignerSurface, SurfaceKind};
use lazorkit_sdk::dialog::message::{ConnectResponseData, MessageBody, SignResponseData};
use lazorkit_sdk::dialog::{InboundEvent, Message, MessageChannel, WireError};
use lazorkit_sdk::state::{PasskeyPubkey, SmartWalletAuthority};
use lazorkit_sdk::utils::{derive_smart_wallet, derive_smart_wallet_authority};
use p256::ecdsa::{signature::Signer, Signature, SigningKey, VerifyingKey};
use parking_lot::Mutex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use solana_sdk::address_lookup_table::state::{AddressLookupTable, LookupTableMeta};
use solana_sdk::{account::Account, hash::Hash, pubkey::Pubkey};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

pub const DIALOG_URL: &str = "https://dialog.lazor.io/connect";
pub const DIALOG_ORIGIN: &str = "https://dialog.lazor.io";
pub const HOST_ORIGIN: &str = "https://app.example";

pub const LOOKUP_TABLE_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("AddressLookupTab1e1111111111111111111111111");

//=============================================================================
// Chain
//=============================================================================

/// In-memory chain state implementing the SDK connection
#[derive(Default)]
pub struct TestContext {
    accounts: Mutex<HashMap<Pubkey, Account>>,
    pub get_account_calls: AtomicUsize,
    pub fail_rpc: AtomicBool,
}

impl TestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&self, address: Pubkey, owner: Pubkey, data: Vec<u8>) {
        self.accounts.lock().insert(
            address,
            Account {
                lamports: 1_000_000,
                data,
                owner,
                executable: false,
                rent_epoch: 0,
            },
        );
    }

    /// Store an authority record at its derived address and return that address
    pub fn add_authority(&self, passkey: PasskeyPubkey, smart_wallet: Pubkey, nonce: u64) -> Pubkey {
        let program_id = lazorkit_interface::ID;
        let (address, bump) = derive_smart_wallet_authority(&program_id, &passkey, &smart_wallet);
        let record = SmartWalletAuthority {
            passkey_pubkey: passkey,
            smart_wallet: smart_wallet.to_bytes(),
            nonce,
            bump,
        };
        self.add_account(address, program_id, record.pack().unwrap());
        address
    }

    pub fn add_lookup_table(&self, addresses: &[Pubkey]) -> Pubkey {
        let address = Pubkey::new_unique();
        let table = AddressLookupTable {
            meta: LookupTableMeta::new(Pubkey::new_unique()),
            addresses: Cow::Borrowed(addresses),
        };
        self.add_account(address, LOOKUP_TABLE_PROGRAM_ID, table.serialize_for_tests().unwrap());
        address
    }

    fn check_rpc(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.fail_rpc.load(Ordering::SeqCst) {
            return Err("rpc unavailable".into());
        }
        Ok(())
    }
}

#[async_trait]
impl SolConnection for TestContext {
    async fn get_account(
        &self,
        pubkey: &Pubkey,
    ) -> Result<Option<Account>, Box<dyn std::error::Error + Send + Sync>> {
        self.check_rpc()?;
        self.get_account_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.lock().get(pubkey).cloned())
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[MemcmpFilter],
    ) -> Result<Vec<(Pubkey, Account)>, Box<dyn std::error::Error + Send + Sync>> {
        self.check_rpc()?;
        let mut matches: Vec<_> = self
            .accounts
            .lock()
            .iter()
            .filter(|(_, account)| account.owner == *program_id)
            .filter(|(_, account)| filters.iter().all(|f| f.matches(&account.data)))
            .map(|(address, account)| (*address, account.clone()))
            .collect();
        matches.sort_by_key(|(address, _)| *address);
        Ok(matches)
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, Box<dyn std::error::Error + Send + Sync>> {
        self.check_rpc()?;
        Ok(Hash::new_from_array([42u8; 32]))
    }
}

//=============================================================================
// Passkeys
//=============================================================================

pub struct TestPasskey {
    pub signing_key: SigningKey,
}

impl TestPasskey {
    pub fn new() -> Self {
        Self {
            signing_key: SigningKey::random(&mut rand::thread_rng()),
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey::from(&self.signing_key)
    }

    /// Raw x || y
    pub fn raw(&self) -> Vec<u8> {
        self.verifying_key().to_encoded_point(false).as_bytes()[1..].to_vec()
    }

    pub fn compressed(&self) -> PasskeyPubkey {
        PasskeyPubkey::from_bytes(&self.raw()).unwrap()
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        let signature: Signature = self.signing_key.sign(message);
        let mut out = [0u8; 64];
        out.copy_from_slice(&signature.to_bytes());
        out
    }

    /// WebAuthn-style assertion over `challenge`
    pub fn assert(&self, challenge: &[u8], nonce: &str) -> SignResponseData {
        let client_data_json = serde_json::json!({
            "type": "webauthn.get",
            "challenge": URL_SAFE_NO_PAD.encode(challenge),
            "origin": DIALOG_ORIGIN,
        })
        .to_string();
        let digest = Sha256::digest(client_data_json.as_bytes());
        let mut authenticator_data = Sha256::digest(b"lazor.io").to_vec();
        authenticator_data.push(0x05);
        authenticator_data.extend_from_slice(&1u32.to_be_bytes());

        let mut signed = authenticator_data.clone();
        signed.extend_from_slice(&digest);

        SignResponseData {
            authenticator_data: STANDARD.encode(&authenticator_data),
            client_data_json: STANDARD.encode(client_data_json.as_bytes()),
            raw_message: STANDARD.encode(challenge),
            client_data_json_digest: STANDARD.encode(digest),
            signature: STANDARD.encode(self.sign(&signed)),
            nonce: nonce.to_string(),
            timestamp: 1_700_000_000_000,
        }
    }
}

pub fn create_wallet(context: &TestContext, passkey: &TestPasskey, id: u64) -> (Pubkey, Pubkey) {
    let (smart_wallet, _) = derive_smart_wallet(&lazorkit_interface::ID, id);
    let authority = context.add_authority(passkey.compressed(), smart_wallet, 0);
    (smart_wallet, authority)
}

//=============================================================================
// Signer surface
//=============================================================================

#[derive(Debug, Clone)]
pub struct Posted {
    pub message: Value,
    pub target_origin: String,
}

/// Host surface that records what the SDK does and hands posts to the test
pub struct MockSurface {
    embedded: bool,
    refused: Mutex<Vec<SurfaceKind>>,
    pub fail_post: AtomicBool,
    /// Posts wait for `release_posts` while set
    pub hold_post: AtomicBool,
    post_gate: Semaphore,
    pub opened: Mutex<Vec<SurfaceKind>>,
    pub closed: AtomicUsize,
    posted: mpsc::UnboundedSender<Posted>,
}

impl MockSurface {
    pub fn new(embedded: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<Posted>) {
        let (posted, rx) = mpsc::unbounded_channel();
        let surface = Arc::new(Self {
            embedded,
            refused: Mutex::new(Vec::new()),
            fail_post: AtomicBool::new(false),
            hold_post: AtomicBool::new(false),
            post_gate: Semaphore::new(0),
            opened: Mutex::new(Vec::new()),
            closed: AtomicUsize::new(0),
            posted,
        });
        (surface, rx)
    }

    pub fn refuse(&self, kind: SurfaceKind) {
        self.refused.lock().push(kind);
    }

    pub fn opened(&self) -> Vec<SurfaceKind> {
        self.opened.lock().clone()
    }

    pub fn release_posts(&self, count: usize) {
        self.post_gate.add_permits(count);
    }
}

#[async_trait]
impl SignerSurface for MockSurface {
    fn supports_embedded(&self) -> bool {
        self.embedded
    }

    async fn open(&self, kind: SurfaceKind, _url: &str) -> Result<(), String> {
        if self.refused.lock().contains(&kind) {
            return Err(format!("{:?} blocked", kind));
        }
        self.opened.lock().push(kind);
        Ok(())
    }

    async fn post(&self, message: Value, target_origin: &str) -> Result<(), String> {
        if self.hold_post.load(Ordering::SeqCst) {
            self.post_gate
                .acquire()
                .await
                .map_err(|e| e.to_string())?
                .forget();
        }
        if self.fail_post.load(Ordering::SeqCst) {
            return Err("surface detached".to_string());
        }
        let _ = self.posted.send(Posted {
            message,
            target_origin: target_origin.to_string(),
        });
        Ok(())
    }

    async fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

//=============================================================================
// Dialog side
//=============================================================================

/// Wait for the next posted request, skipping close notifications
pub async fn next_request(rx: &mut mpsc::UnboundedReceiver<Posted>) -> Message {
    loop {
        let posted = rx.recv().await.expect("surface dropped");
        let message = Message::decode(posted.message).unwrap();
        if !matches!(message.body, MessageBody::Close) {
            return message;
        }
    }
}

pub fn connect_ok(request_id: &str, credential_id: &str, public_key: &str) -> Value {
    connect_ok_answering(request_id, credential_id, public_key, None)
}

/// Successful connect response that echoes `challenge`
pub fn connect_ok_answering(
    request_id: &str,
    credential_id: &str,
    public_key: &str,
    challenge: Option<&str>,
) -> Value {
    Message::connect_response(
        request_id,
        Ok(ConnectResponseData {
            public_key: public_key.to_string(),
            credential_id: credential_id.to_string(),
            is_created: true,
            signature: None,
            challenge: challenge.map(str::to_string),
        }),
    )
    .encode()
    .unwrap()
}

/// Challenge carried by a connect request
pub fn request_challenge(request: &Message) -> String {
    match &request.body {
        MessageBody::ConnectRequest { data } => data.challenge.clone(),
        other => panic!("expected connect request, got {:?}", other),
    }
}

/// Sign response from `passkey` for a posted sign request
pub fn sign_ok(request: &Message, passkey: &TestPasskey) -> Value {
    let MessageBody::SignRequest { data } = &request.body else {
        panic!("expected sign request, got {}", request.kind());
    };
    let challenge = STANDARD.decode(&data.message).unwrap();
    Message::sign_response(&request.id, Ok(passkey.assert(&challenge, &data.nonce)))
        .encode()
        .unwrap()
}

pub fn connect_err(request_id: &str, code: &str) -> Value {
    Message::connect_response(
        request_id,
        Err(WireError {
            code: code.to_string(),
            message: "passkey ceremony failed".to_string(),
            details: None,
        }),
    )
    .encode()
    .unwrap()
}

pub fn deliver(channel: &MessageChannel, origin: &str, data: Value) -> bool {
    channel.handle_event(InboundEvent::new(origin, data))
}

/// Answers every request the way the hosted dialog would, using `passkey`
pub fn spawn_fake_dialog(
    channel: Arc<MessageChannel>,
    mut rx: mpsc::UnboundedReceiver<Posted>,
    passkey: Arc<TestPasskey>,
    credential_id: &str,
) -> tokio::task::JoinHandle<()> {
    let credential_id = credential_id.to_string();
    tokio::spawn(async move {
        while let Some(posted) = rx.recv().await {
            let Ok(request) = Message::decode(posted.message) else {
                continue;
            };
            let response = match &request.body {
                MessageBody::ConnectRequest { .. } => connect_ok(
                    &request.id,
                    &credential_id,
                    &STANDARD.encode(passkey.raw()),
                ),
                MessageBody::SignRequest { .. } => sign_ok(&request, &passkey),
                _ => continue,
            };
            deliver(&channel, DIALOG_ORIGIN, response);
        }
    })
}
