//! Cross-context protocol between the host page and the signer surface.

pub mod challenge;
pub mod channel;
pub mod correlator;
pub mod credentials;
pub mod message;
pub mod origin;

pub use challenge::ChallengeTracker;
pub use channel::{ChannelConfig, InboundEvent, MessageChannel};
pub use correlator::{PendingHandle, RequestCorrelator};
pub use credentials::CredentialStore;
pub use message::{Message, MessageBody, Source, WireError};
pub use origin::OriginValidator;
