//! # System Lifecycle & Orchestration
//!
//! The providers are simple on their own; wiring them together is where the
//! coordination lives. [`StorefrontSystem`] is the conductor:
//!
//! 1. **Actor Creation** - the session and cart actors and their clients
//! 2. **Dependency Injection** - gateway and durable store handed to each actor's `run`
//! 3. **Session Bridge** - a task that moves the cart between guest and remote
//!    persistence as the session changes, and turns gateway expiry signals into
//!    session expiry
//! 4. **Graceful Shutdown** - stop the bridge, drop the clients, await the actors
//!
//! ```rust,ignore
//! let system = StorefrontSystem::from_config(&config).await?;
//! system.login("alice", "secret").await?;
//! system.cart_client.add_item(product, 1, None, None).await?;
//! system.shutdown().await?;
//! ```

pub mod storefront_system;
pub mod tracing;

pub use storefront_system::*;
