use async_trait::async_trait;

/// Kind of isolated surface hosting the passkey ceremony.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Frame embedded in the host page
    Embedded,
    /// Separate top-level window
    Window,
}

/// Abstraction for the isolated context that performs passkey signing.
/// This allows the SDK to work with:
/// 1. Browser hosts (iframe / window.open + postMessage)
/// 2. Native shells embedding a web view
/// 3. In-process fakes for tests
///
/// Inbound traffic does not flow through this trait; the host forwards
/// surface messages to `MessageChannel::handle_event` or `MessageChannel::run`.
#[async_trait]
pub trait SignerSurface: Send + Sync {
    /// Whether the host can embed the surface in-page.
    fn supports_embedded(&self) -> bool;

    /// Open the surface at `url`.
    /// Returns Err if the host refuses (e.g. popup blocked).
    async fn open(&self, kind: SurfaceKind, url: &str) -> Result<(), String>;

    /// Post a serialized message to the surface, restricted to `target_origin`.
    async fn post(&self, message: serde_json::Value, target_origin: &str) -> Result<(), String>;

    /// Close the surface. Closing an already closed surface is a no-op.
    async fn close(&self);
}
