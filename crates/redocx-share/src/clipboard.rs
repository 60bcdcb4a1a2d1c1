//! Clipboard sinks for share links.

use std::sync::mpsc;
use std::sync::Mutex;
use std::thread;

use crate::ShareError;

/// Best-effort destination for a share link.
pub trait ClipboardSink: Send + Sync {
    /// Replace the sink's contents with `text`.
    fn push(&self, text: &str) -> Result<(), ShareError>;
}

/// Something that can hold clipboard text.
trait TextTarget {
    fn set_text(&mut self, text: String) -> Result<(), ShareError>;
}

impl TextTarget for arboard::Clipboard {
    fn set_text(&mut self, text: String) -> Result<(), ShareError> {
        arboard::Clipboard::set_text(self, text).map_err(|e| ShareError::Clipboard(e.to_string()))
    }
}

type Opener = fn() -> Result<Box<dyn TextTarget>, ShareError>;
type Request = (String, mpsc::Sender<Result<(), ShareError>>);

fn open_system() -> Result<Box<dyn TextTarget>, ShareError> {
    let clipboard =
        arboard::Clipboard::new().map_err(|e| ShareError::Clipboard(e.to_string()))?;
    Ok(Box::new(clipboard))
}

/// The desktop clipboard.
///
/// On X11 and Wayland the selection is only served while a clipboard handle
/// is alive, so a single handle lives on a dedicated owner thread, opened on
/// the first push and kept for the life of the sink.
#[derive(Debug)]
pub struct SystemClipboard {
    owner: Mutex<Option<mpsc::Sender<Request>>>,
    open: Opener,
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::with_opener(open_system)
    }

    fn with_opener(open: Opener) -> Self {
        Self {
            owner: Mutex::new(None),
            open,
        }
    }
}

/// Start the thread that owns the clipboard handle.
fn spawn_owner(open: Opener) -> Result<mpsc::Sender<Request>, ShareError> {
    let (tx, rx) = mpsc::channel::<Request>();

    thread::Builder::new()
        .name("redocx-clipboard".to_string())
        .spawn(move || {
            let mut target: Option<Box<dyn TextTarget>> = None;

            while let Ok((text, reply)) = rx.recv() {
                let result = match target.as_mut() {
                    Some(t) => t.set_text(text),
                    None => open().and_then(|t| target.insert(t).set_text(text)),
                };
                if result.is_err() {
                    target = None;
                }
                let _ = reply.send(result);
            }
        })
        .map_err(|e| ShareError::Clipboard(e.to_string()))?;

    Ok(tx)
}

impl ClipboardSink for SystemClipboard {
    fn push(&self, text: &str) -> Result<(), ShareError> {
        let mut owner = self
            .owner
            .lock()
            .map_err(|_| ShareError::Clipboard("clipboard owner lock poisoned".to_string()))?;

        let tx = match owner.as_ref() {
            Some(tx) => tx.clone(),
            None => owner.insert(spawn_owner(self.open)?).clone(),
        };

        let (reply_tx, reply_rx) = mpsc::channel();
        if tx.send((text.to_string(), reply_tx)).is_err() {
            *owner = None;
            return Err(ShareError::Clipboard("clipboard owner thread exited".to_string()));
        }

        reply_rx
            .recv()
            .map_err(|_| ShareError::Clipboard("clipboard owner thread exited".to_string()))?
    }
}

/// Sink used when clipboard delivery is turned off.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClipboard;

impl ClipboardSink for NoClipboard {
    fn push(&self, _text: &str) -> Result<(), ShareError> {
        Ok(())
    }
}
