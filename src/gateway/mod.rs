//! Orchestration layer.
//!
//! [`Bifrost::builder()`](builder::Bifrost::builder) wires adapters,
//! fallback chains, and resilience knobs into a [`UnifiedProvider`] —
//! the single façade application code calls.

pub mod builder;
pub mod unified;

pub use builder::{Bifrost, BifrostBuilder, FallbackConfig};
pub use unified::UnifiedProvider;
