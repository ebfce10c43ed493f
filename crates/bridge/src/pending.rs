use std::collections::BTreeMap;

use geo::ViewportBounds;
use protocol::MessageId;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::BridgeError;

/// Default reply deadline, in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 3_000;

#[derive(Debug)]
struct Entry {
    deadline_ms: u64,
    resolver: oneshot::Sender<Result<ViewportBounds, BridgeError>>,
}

/// Converts the channel's fire-and-forget semantics into a promise-like
/// call for commands that need a reply.
///
/// Invariants:
/// - At most one live entry per id; ids come from a monotonic counter.
/// - An entry is removed on resolution or timeout, whichever fires first.
/// - Resolution for an unknown or already-removed id is a no-op.
///
/// Time is passed in explicitly (`now_ms`) and expiry happens in `sweep`,
/// so timeout behavior is deterministic and testable without sleeping.
/// Concurrent `issue` calls for the same logical operation are not
/// de-duplicated; each gets an independent id and deadline.
#[derive(Debug)]
pub struct PendingRequests {
    next_id: u64,
    timeout_ms: u64,
    entries: BTreeMap<u64, Entry>,
}

/// The caller's half of an issued request.
#[derive(Debug)]
pub struct PendingReply {
    rx: oneshot::Receiver<Result<ViewportBounds, BridgeError>>,
}

impl PendingReply {
    /// Await resolution. A dropped registry reads as a closed channel.
    pub async fn wait(self) -> Result<ViewportBounds, BridgeError> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(BridgeError::ChannelClosed),
        }
    }

    /// Non-blocking poll; `None` while still pending.
    pub fn try_take(&mut self) -> Option<Result<ViewportBounds, BridgeError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(BridgeError::ChannelClosed)),
        }
    }
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT_MS)
    }

    pub fn with_timeout(timeout_ms: u64) -> Self {
        Self {
            next_id: 1,
            timeout_ms,
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register a new request. Returns the wire id to attach to the
    /// outgoing command and the caller's reply handle.
    pub fn issue(&mut self, now_ms: u64) -> (MessageId, PendingReply) {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        let (tx, rx) = oneshot::channel();
        self.entries.insert(
            id,
            Entry {
                deadline_ms: now_ms.saturating_add(self.timeout_ms),
                resolver: tx,
            },
        );
        (id.to_string(), PendingReply { rx })
    }

    /// Resolve a matching reply envelope.
    ///
    /// Returns `false` for unknown, late, or unparseable ids — a late reply
    /// after timeout is silently discarded here.
    pub fn resolve(&mut self, message_id: &str, bounds: ViewportBounds) -> bool {
        let Ok(id) = message_id.parse::<u64>() else {
            debug!(message_id, "reply with unparseable id dropped");
            return false;
        };
        let Some(entry) = self.entries.remove(&id) else {
            debug!(message_id, "late or unknown reply dropped");
            return false;
        };
        // The caller may have given up and dropped its receiver; that is
        // equivalent to a resolved-then-ignored request.
        let _ = entry.resolver.send(Ok(bounds));
        true
    }

    /// Reject every entry whose deadline has passed. Returns how many
    /// timed out.
    pub fn sweep(&mut self, now_ms: u64) -> usize {
        let expired: Vec<u64> = self
            .entries
            .iter()
            .filter(|(_, e)| e.deadline_ms <= now_ms)
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            if let Some(entry) = self.entries.remove(id) {
                let _ = entry.resolver.send(Err(BridgeError::Timeout {
                    waited_ms: self.timeout_ms,
                }));
            }
        }
        expired.len()
    }
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::PendingRequests;
    use crate::error::BridgeError;
    use geo::ViewportBounds;

    fn bounds() -> ViewportBounds {
        ViewportBounds::new(35.0, 35.1, 128.8, 128.9)
    }

    #[test]
    fn resolve_delivers_and_removes() {
        let mut reg = PendingRequests::with_timeout(3_000);
        let (id, mut reply) = reg.issue(0);
        assert_eq!(reg.len(), 1);

        assert!(reg.resolve(&id, bounds()));
        assert!(reg.is_empty());
        assert_eq!(reply.try_take(), Some(Ok(bounds())));

        // Duplicate resolution is a no-op.
        assert!(!reg.resolve(&id, bounds()));
    }

    #[test]
    fn sweep_rejects_expired_entries() {
        let mut reg = PendingRequests::with_timeout(3_000);
        let (id, mut reply) = reg.issue(0);

        assert_eq!(reg.sweep(2_999), 0);
        assert!(reply.try_take().is_none());

        assert_eq!(reg.sweep(3_000), 1);
        assert_eq!(
            reply.try_take(),
            Some(Err(BridgeError::Timeout { waited_ms: 3_000 }))
        );

        // A reply arriving after the timeout is silently discarded.
        assert!(!reg.resolve(&id, bounds()));
    }

    #[test]
    fn ids_are_not_confused_across_requests() {
        let mut reg = PendingRequests::with_timeout(3_000);
        let (first_id, mut first) = reg.issue(0);
        reg.sweep(5_000);

        let (second_id, mut second) = reg.issue(5_000);
        assert_ne!(first_id, second_id);

        assert!(reg.resolve(&second_id, bounds()));
        assert_eq!(second.try_take(), Some(Ok(bounds())));

        // The first caller saw its timeout, never the second's reply.
        assert_eq!(
            first.try_take(),
            Some(Err(BridgeError::Timeout { waited_ms: 3_000 }))
        );
        assert!(!reg.resolve(&first_id, bounds()));
    }

    #[test]
    fn concurrent_issues_get_independent_deadlines() {
        let mut reg = PendingRequests::with_timeout(3_000);
        let (_, mut a) = reg.issue(0);
        let (id_b, mut b) = reg.issue(2_000);

        assert_eq!(reg.sweep(3_500), 1);
        assert!(matches!(a.try_take(), Some(Err(_))));
        assert!(b.try_take().is_none());

        assert!(reg.resolve(&id_b, bounds()));
        assert_eq!(b.try_take(), Some(Ok(bounds())));
    }

    #[tokio::test]
    async fn wait_resolves_asynchronously() {
        let mut reg = PendingRequests::with_timeout(3_000);
        let (id, reply) = reg.issue(0);
        reg.resolve(&id, bounds());
        assert_eq!(reply.wait().await, Ok(bounds()));
    }

    #[tokio::test]
    async fn dropped_registry_reads_as_closed() {
        let mut reg = PendingRequests::with_timeout(3_000);
        let (_, reply) = reg.issue(0);
        drop(reg);
        assert_eq!(reply.wait().await, Err(BridgeError::ChannelClosed));
    }
}
