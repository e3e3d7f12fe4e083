//! Wire envelope exchanged with the signer surface.
//!
//! Every message is a flat JSON object: the envelope fields plus a `type`
//! tag selecting the payload. Responses carry exactly one of `data` or
//! `error`.

use crate::core::constants::PROTOCOL_VERSION;
use crate::error::ChannelError;
use crate::types::{Credential, SignedMessage};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// The host page, which initiates requests
    Parent,
    /// The signer surface, which answers them
    Dialog,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectRequestData {
    pub origin: String,
    pub challenge: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponseData {
    pub public_key: String,
    pub credential_id: String,
    #[serde(default)]
    pub is_created: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// The request's challenge, echoed back by the surface
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
}

impl From<ConnectResponseData> for Credential {
    fn from(data: ConnectResponseData) -> Self {
        Credential {
            credential_id: data.credential_id,
            public_key: data.public_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequestData {
    /// Base64 message to sign
    pub message: String,
    pub origin: String,
    pub nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResponseData {
    pub authenticator_data: String,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub raw_message: String,
    #[serde(rename = "clientDataJSONDigest")]
    pub client_data_json_digest: String,
    pub signature: String,
    pub nonce: String,
    #[serde(default)]
    pub timestamp: u64,
}

impl TryFrom<SignResponseData> for SignedMessage {
    type Error = ChannelError;

    fn try_from(data: SignResponseData) -> Result<Self, Self::Error> {
        let authenticator_data = decode_field("authenticatorData", &data.authenticator_data)?;
        let client_data_json = decode_field("clientDataJSON", &data.client_data_json)?;
        let message = decode_field("rawMessage", &data.raw_message)?;
        let digest = decode_field("clientDataJSONDigest", &data.client_data_json_digest)?;
        let signature = decode_field("signature", &data.signature)?;

        let client_data_digest: [u8; 32] = digest.try_into().map_err(|d: Vec<u8>| {
            ChannelError::InvalidArgument(format!("clientDataJSONDigest is {} bytes", d.len()))
        })?;
        if Sha256::digest(&client_data_json).as_slice() != client_data_digest {
            return Err(ChannelError::InvalidArgument(
                "clientDataJSONDigest does not match clientDataJSON".to_string(),
            ));
        }
        let signature: [u8; 64] = signature.try_into().map_err(|s: Vec<u8>| {
            ChannelError::InvalidArgument(format!("signature is {} bytes", s.len()))
        })?;

        Ok(SignedMessage {
            message,
            nonce: data.nonce,
            client_data_json,
            client_data_digest,
            signature,
            authenticator_data,
            timestamp: data.timestamp,
        })
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, ChannelError> {
    STANDARD
        .decode(value)
        .map_err(|e| ChannelError::InvalidArgument(format!("{} is not base64: {}", name, e)))
}

/// Response payload: `data` on success, `error` on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl<T> ResponseBody<T> {
    fn from_result(result: Result<T, WireError>) -> Self {
        match result {
            Ok(data) => Self {
                data: Some(data),
                error: None,
            },
            Err(error) => Self {
                data: None,
                error: Some(error),
            },
        }
    }

    fn is_well_formed(&self) -> bool {
        self.data.is_some() != self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MessageBody {
    #[serde(rename = "passkey:connect")]
    ConnectRequest { data: ConnectRequestData },

    #[serde(rename = "passkey:connect:response")]
    ConnectResponse(ResponseBody<ConnectResponseData>),

    #[serde(rename = "passkey:sign")]
    SignRequest { data: SignRequestData },

    #[serde(rename = "passkey:sign:response")]
    SignResponse(ResponseBody<SignResponseData>),

    /// The surface is closing, or is being asked to close
    #[serde(rename = "dialog:close")]
    Close,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub timestamp: u64,
    pub version: String,
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Milliseconds the surface spent on the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl Message {
    fn new(source: Source, request_id: Option<String>, body: MessageBody) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: now_millis(),
            version: PROTOCOL_VERSION.to_string(),
            source,
            request_id,
            duration: None,
            body,
        }
    }

    pub fn connect_request(origin: impl Into<String>, challenge: impl Into<String>) -> Self {
        Self::new(
            Source::Parent,
            None,
            MessageBody::ConnectRequest {
                data: ConnectRequestData {
                    origin: origin.into(),
                    challenge: challenge.into(),
                },
            },
        )
    }

    pub fn sign_request(data: SignRequestData) -> Self {
        Self::new(Source::Parent, None, MessageBody::SignRequest { data })
    }

    pub fn close_notification(source: Source) -> Self {
        Self::new(source, None, MessageBody::Close)
    }

    pub fn connect_response(
        request_id: impl Into<String>,
        result: Result<ConnectResponseData, WireError>,
    ) -> Self {
        Self::new(
            Source::Dialog,
            Some(request_id.into()),
            MessageBody::ConnectResponse(ResponseBody::from_result(result)),
        )
    }

    pub fn sign_response(
        request_id: impl Into<String>,
        result: Result<SignResponseData, WireError>,
    ) -> Self {
        Self::new(
            Source::Dialog,
            Some(request_id.into()),
            MessageBody::SignResponse(ResponseBody::from_result(result)),
        )
    }

    pub fn kind(&self) -> &'static str {
        match self.body {
            MessageBody::ConnectRequest { .. } => "passkey:connect",
            MessageBody::ConnectResponse(_) => "passkey:connect:response",
            MessageBody::SignRequest { .. } => "passkey:sign",
            MessageBody::SignResponse(_) => "passkey:sign:response",
            MessageBody::Close => "dialog:close",
        }
    }

    pub fn is_response(&self) -> bool {
        matches!(
            self.body,
            MessageBody::ConnectResponse(_) | MessageBody::SignResponse(_)
        )
    }

    /// The error carried by a response, if any
    pub fn response_error(&self) -> Option<&WireError> {
        match &self.body {
            MessageBody::ConnectResponse(body) => body.error.as_ref(),
            MessageBody::SignResponse(body) => body.error.as_ref(),
            _ => None,
        }
    }

    pub fn encode(&self) -> Result<serde_json::Value, ChannelError> {
        serde_json::to_value(self).map_err(|e| ChannelError::Serialization(e.to_string()))
    }

    /// Decode and check structural rules the type system cannot express
    pub fn decode(value: serde_json::Value) -> Result<Self, ChannelError> {
        let message: Message =
            serde_json::from_value(value).map_err(|e| ChannelError::Serialization(e.to_string()))?;

        let well_formed = match &message.body {
            MessageBody::ConnectResponse(body) => body.is_well_formed(),
            MessageBody::SignResponse(body) => body.is_well_formed(),
            _ => true,
        };
        if !well_formed {
            return Err(ChannelError::Serialization(
                "response must carry exactly one of data or error".to_string(),
            ));
        }
        if message.is_response() && message.request_id.is_none() {
            return Err(ChannelError::Serialization(
                "response without requestId".to_string(),
            ));
        }
        Ok(message)
    }

    pub fn into_credential(self) -> Result<Credential, ChannelError> {
        self.into_connect_data().map(Credential::from)
    }

    pub fn into_connect_data(self) -> Result<ConnectResponseData, ChannelError> {
        match self.body {
            MessageBody::ConnectResponse(ResponseBody {
                data: Some(data), ..
            }) => Ok(data),
            _ => Err(ChannelError::InvalidArgument(format!(
                "expected connect response data, got {}",
                self.kind()
            ))),
        }
    }

    pub fn into_signed_message(self) -> Result<SignedMessage, ChannelError> {
        match self.body {
            MessageBody::SignResponse(ResponseBody {
                data: Some(data), ..
            }) => data.try_into(),
            _ => Err(ChannelError::InvalidArgument(format!(
                "expected sign response data, got {}",
                self.kind()
            ))),
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
