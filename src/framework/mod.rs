//! Generic actor framework for the storefront providers.
//!
//! This module provides the building blocks shared by the session provider and the
//! cart store: a single-owner actor that applies operations strictly one at a time
//! and publishes its state after every change.
//!
//! # Main Components
//!
//! - [`ActorEntity`] - Trait that a provider's state implements to be driven by an actor
//! - [`ResourceActor`] - Generic actor that owns the entity and runs its message loop
//! - [`ResourceClient`] - Cloneable handle for sending requests and reading published state
//! - [`StatePublisher`] - Publication hook for intermediate state during an action
//! - [`FrameworkError`] - Common error types
//!
//! # Testing
//!
//! See [`mock`] module for utilities to test clients without spawning full actors.

pub mod core;
pub mod mock;

// Re-export core types for convenience
pub use core::*;
