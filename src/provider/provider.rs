//! # Instance resolution seam.
//!
//! The dispatch core never constructs consumers. It hands a [`ConsumerType`] to a
//! [`ConsumerProvider`] and gets back zero or more live instances. How they are
//! built (shared, per scope, fresh each time) is the provider's business.
//!
//! ```text
//! EventBus::send ────────────► root provider ──get_consumers(ty)──► [Instance..]
//! QueueProcessor (per pass) ─► ScopeFactory::create_scope() ─► scoped provider
//! ```

use std::any::Any;
use std::sync::Arc;

use crate::consumers::ConsumerType;
use crate::error::ProviderError;

/// Live consumer object, type-erased.
///
/// The resolver downcasts it back to the concrete consumer type before calling a
/// handler; an instance of the wrong type is treated as a missing handler.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Resolves consumer types into live instances.
pub trait ConsumerProvider: Send + Sync + 'static {
    /// Returns every instance registered for `ty`.
    ///
    /// An empty vector is a valid answer and does not fail the dispatch.
    fn get_consumers(&self, ty: ConsumerType) -> Result<Vec<Instance>, ProviderError>;
}

/// Opens resolution scopes; the queue processor opens one per drain pass.
pub trait ScopeFactory: Send + Sync + 'static {
    /// Creates a provider whose scoped instances live as long as the returned handle.
    fn create_scope(&self) -> Result<Arc<dyn ConsumerProvider>, ProviderError>;
}
