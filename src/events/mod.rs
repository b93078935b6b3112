//! Event data model: what flows through the bus and how it is identified.
//!
//! ## Contents
//! - [`Event`] marker trait every dispatchable value implements
//! - [`EventType`] routing identity (type id + name + declared supertypes)
//! - [`Supertype`] declared base view of an event, with its projection
//! - [`AnyEvent`] type-erased event value stored by the events queue
//!
//! ## Quick reference
//! - **Exact routing** compares `EventType`s for equality.
//! - **Polymorphic routing** uses [`EventType::is_related_to`], which walks
//!   declared supertypes in both directions.

mod event;

pub(crate) use event::short_name;
pub use event::{AnyEvent, Event, EventType, Supertype};
