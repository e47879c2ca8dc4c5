//! Handing outbound URIs to whatever opens them
//!
//! The channel never opens a URI itself. On a device that is the OS link
//! handler; in the CLI it is stdout; in tests it is a queue drained by a
//! simulated wallet.

use tokio::sync::mpsc;
use url::Url;

use crate::error::{BridgeError, BridgeResult};

pub trait Dispatcher: Send + Sync {
    /// Hand the URI off. Must not block waiting for the wallet.
    fn dispatch(&self, uri: &Url) -> BridgeResult<()>;
}

/// Pushes every URI onto an unbounded queue
#[derive(Debug, Clone)]
pub struct QueueDispatcher {
    sender: mpsc::UnboundedSender<Url>,
}

impl QueueDispatcher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Url>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Dispatcher for QueueDispatcher {
    fn dispatch(&self, uri: &Url) -> BridgeResult<()> {
        self.sender
            .send(uri.clone())
            .map_err(|_| BridgeError::protocol("Unable to open wallet link: receiver closed"))
    }
}
