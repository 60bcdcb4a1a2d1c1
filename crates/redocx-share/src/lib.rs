//! Share links for freshly rendered artifacts.
//!
//! Advertises artifacts through the address of a named network interface and
//! hands the resulting URL to the system clipboard.

pub mod clipboard;
pub mod notifier;
pub mod resolver;

pub use clipboard::{ClipboardSink, NoClipboard, SystemClipboard};
pub use notifier::LinkNotifier;
pub use resolver::{AddressResolver, InterfaceResolver};

/// Errors that can occur while composing or delivering a share link.
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("Network interface '{0}' not found")]
    InterfaceNotFound(String),

    #[error("Network interface '{0}' has no non-loopback IPv4 address")]
    NoIpv4Address(String),

    #[error("Failed to list network interfaces: {0}")]
    InterfaceQuery(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),
}
