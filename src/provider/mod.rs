//! # Consumer instance resolution.
//!
//! - [`ConsumerProvider`] / [`ScopeFactory`] the seam the dispatch core resolves through
//! - [`Container`] built-in provider with [`Lifetime`]-aware registrations
//!
//! Any other DI mechanism plugs in by implementing both traits.

mod container;
mod provider;

pub use container::{Container, Lifetime};
pub use provider::{ConsumerProvider, Instance, ScopeFactory};
