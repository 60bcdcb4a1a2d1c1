//! Share link composition and delivery.

use redocx_build::Extensions;

use crate::clipboard::ClipboardSink;
use crate::resolver::AddressResolver;
use crate::ShareError;

/// Turns artifact paths into LAN-reachable URLs and pushes them to a sink.
pub struct LinkNotifier {
    resolver: Box<dyn AddressResolver>,
    clipboard: Box<dyn ClipboardSink>,
    port: u16,
    extensions: Extensions,
}

impl LinkNotifier {
    pub fn new(
        resolver: Box<dyn AddressResolver>,
        clipboard: Box<dyn ClipboardSink>,
        port: u16,
        extensions: Extensions,
    ) -> Self {
        Self {
            resolver,
            clipboard,
            port,
            extensions,
        }
    }

    /// Compose `http://<ip>:<port>/<artifact>` for a rendered artifact.
    ///
    /// The address is resolved on every call. Any source extension left in
    /// the artifact path is swapped for the rendered one.
    pub fn share_link(&self, artifact_path: &str) -> Result<String, ShareError> {
        let ip = self.resolver.resolve()?;

        Ok(format!(
            "http://{}:{}/{}",
            ip,
            self.port,
            self.extensions.to_rendered(artifact_path)
        ))
    }

    /// Push a link to the clipboard. Failures are logged and swallowed.
    pub fn publish(&self, link: &str) {
        if let Err(e) = self.clipboard.push(link) {
            tracing::warn!("Failed to copy share link to clipboard: {}", e);
        }
    }
}

impl std::fmt::Debug for LinkNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkNotifier")
            .field("port", &self.port)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}
