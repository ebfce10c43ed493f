use std::future::Future;
use std::pin::Pin;

use geo::ViewportBounds;
use protocol::ShelterMarker;

/// Recoverable shelter-search failure.
///
/// The controller logs these and keeps its current shelter list; a failed
/// fetch never tears down the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError(String);

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "shelter search failed: {}", self.0)
    }
}

impl std::error::Error for FetchError {}

/// Boxed future so the trait below stays dyn-compatible.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// External shelter-search collaborator, keyed by viewport.
pub trait ShelterSearch: Send + Sync {
    /// Find shelters inside the given viewport.
    fn find_in_bounds(
        &self,
        bounds: ViewportBounds,
    ) -> BoxFuture<'_, Result<Vec<ShelterMarker>, FetchError>>;
}
