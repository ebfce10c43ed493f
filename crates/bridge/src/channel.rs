use tokio::sync::mpsc;
use tracing::debug;

/// One side of the bridge: send raw envelopes out, receive raw envelopes in.
///
/// Sends are fire-and-forget. If the peer endpoint has been dropped (the
/// surface was torn down or reloaded), the envelope is silently lost — that
/// is the contract, not an error.
#[derive(Debug)]
pub struct Endpoint {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl Endpoint {
    pub fn send(&self, raw: String) {
        if self.tx.send(raw).is_err() {
            debug!("bridge peer gone; envelope dropped");
        }
    }

    /// Await the next inbound envelope; `None` once the peer is gone and
    /// the inbox is drained.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Non-blocking inbox poll for synchronous pump loops.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

/// Build a connected host/surface endpoint pair.
///
/// A surface reload tears down its endpoint and gets a fresh pair;
/// envelopes in flight across the reload are lost by design.
pub fn channel() -> (Endpoint, Endpoint) {
    let (host_tx, surface_rx) = mpsc::unbounded_channel();
    let (surface_tx, host_rx) = mpsc::unbounded_channel();
    (
        Endpoint {
            tx: host_tx,
            rx: host_rx,
        },
        Endpoint {
            tx: surface_tx,
            rx: surface_rx,
        },
    )
}
