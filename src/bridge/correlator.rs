//! Request/callback correlation
//!
//! One slot per [`RequestKind`]. Registering a kind hands out a fresh
//! correlation id and a one-shot receiver; a later registration of the same
//! kind resolves the earlier waiter with a `Superseded` error instead of
//! leaving it hanging. Callbacks carrying an id that no longer matches the
//! slot are rejected.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;

use super::types::{CorrelationId, RequestKind, WalletResponse};
use crate::error::{BridgeError, BridgeResult};
use crate::utils::crypto::random_id;

type Reply = BridgeResult<WalletResponse>;

struct Slot {
    id: CorrelationId,
    sender: oneshot::Sender<Reply>,
}

type Slots = Arc<Mutex<HashMap<RequestKind, Slot>>>;

fn lock(slots: &Slots) -> BridgeResult<MutexGuard<'_, HashMap<RequestKind, Slot>>> {
    slots
        .lock()
        .map_err(|_| BridgeError::internal("Correlator lock poisoned"))
}

/// Routes wallet callbacks to the request that is waiting for them
#[derive(Clone, Default)]
pub struct RequestCorrelator {
    slots: Slots,
    timeout: Option<Duration>,
}

impl RequestCorrelator {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            slots: Slots::default(),
            timeout,
        }
    }

    /// Open the slot for `kind`, superseding whoever held it
    pub fn register(&self, kind: RequestKind) -> BridgeResult<PendingResponse> {
        let id = CorrelationId(random_id());
        let (sender, receiver) = oneshot::channel();

        let previous = lock(&self.slots)?.insert(
            kind,
            Slot {
                id: id.clone(),
                sender,
            },
        );
        if let Some(previous) = previous {
            crate::log_debug!("bridge", "Superseding pending request", kind = kind);
            let _ = previous.sender.send(Err(BridgeError::superseded(format!(
                "{} request superseded by a newer one",
                kind
            ))));
        }

        Ok(PendingResponse {
            kind,
            id,
            receiver,
            timeout: self.timeout,
            slots: Arc::clone(&self.slots),
        })
    }

    /// Whether a callback for `kind` with this id may be processed.
    ///
    /// A callback without an id is routed by kind alone.
    pub fn check(&self, kind: RequestKind, id: Option<&str>) -> BridgeResult<bool> {
        let slots = lock(&self.slots)?;
        match slots.get(&kind) {
            None => Ok(false),
            Some(slot) => match id {
                Some(id) if id != slot.id.as_str() => Err(stale(kind)),
                _ => Ok(true),
            },
        }
    }

    /// Deliver a result to the waiter for `kind`. Returns `false` when nobody was waiting.
    pub fn resolve(&self, kind: RequestKind, id: Option<&str>, reply: Reply) -> BridgeResult<bool> {
        let mut slots = lock(&self.slots)?;
        if let (Some(slot), Some(id)) = (slots.get(&kind), id) {
            if id != slot.id.as_str() {
                return Err(stale(kind));
            }
        }
        match slots.remove(&kind) {
            Some(slot) => {
                // The receiver may already be gone (caller dropped the future)
                let _ = slot.sender.send(reply);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop the slot for `kind` if it still belongs to `id`
    pub fn cancel(&self, kind: RequestKind, id: &CorrelationId) -> BridgeResult<()> {
        clear_slot(&self.slots, kind, id)
    }

    pub fn is_pending(&self, kind: RequestKind) -> bool {
        lock(&self.slots)
            .map(|slots| slots.contains_key(&kind))
            .unwrap_or(false)
    }
}

fn stale(kind: RequestKind) -> BridgeError {
    BridgeError::protocol(format!("Stale {} callback: correlation id does not match", kind))
}

fn clear_slot(slots: &Slots, kind: RequestKind, id: &CorrelationId) -> BridgeResult<()> {
    let mut slots = lock(slots)?;
    if slots.get(&kind).map(|slot| &slot.id == id).unwrap_or(false) {
        slots.remove(&kind);
    }
    Ok(())
}

/// Handle to a registered request
pub struct PendingResponse {
    kind: RequestKind,
    id: CorrelationId,
    receiver: oneshot::Receiver<Reply>,
    timeout: Option<Duration>,
    slots: Slots,
}

impl PendingResponse {
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn id(&self) -> &CorrelationId {
        &self.id
    }

    /// Wait for the wallet. Bounded only when the correlator has a timeout.
    pub async fn wait(self) -> Reply {
        let PendingResponse {
            kind,
            id,
            receiver,
            timeout,
            slots,
        } = self;

        let received = match timeout {
            None => receiver.await,
            Some(limit) => match tokio::time::timeout(limit, receiver).await {
                Ok(received) => received,
                Err(_) => {
                    clear_slot(&slots, kind, &id)?;
                    return Err(BridgeError::timeout(format!(
                        "No wallet response to {} within {}s",
                        kind,
                        limit.as_secs_f64()
                    )));
                }
            },
        };

        received.map_err(|_| BridgeError::protocol("Bridge closed before the wallet responded"))?
    }
}
