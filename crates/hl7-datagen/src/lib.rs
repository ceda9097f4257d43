//! Synthetic value sourcing.
//!
//! Every slot value in a generated message comes through the [`ValueSource`]
//! trait. Two implementations exist: [`FallbackSource`] samples curated
//! in-memory datasets and always succeeds, and [`EnhancedSource`] asks a
//! configured HTTP endpoint for richer content. [`EnhancedWithFallback`]
//! composes them so that any enhancement failure silently degrades to the
//! fallback for that slot; a failing enhancement never aborts generation.

mod context;
mod datasets;
mod enhanced;
mod error;
mod fallback;

pub use context::{AgeBand, FieldSlot, GenContext, Value};
pub use enhanced::{EnhancedConfig, EnhancedSource, EnhancedWithFallback};
pub use error::ProviderError;
pub use fallback::FallbackSource;

/// A source of synthetic slot values.
///
/// Implementations must honor the slot's table constraint: a coded slot
/// with a referenced table always receives a code literally present in
/// that table. Violating this is a provider bug, not a validator concern.
pub trait ValueSource: Send + Sync {
    fn provide(&self, slot: &FieldSlot<'_>, ctx: &GenContext) -> Result<Value, ProviderError>;
}
