//! # Storefront Sync
//!
//! > **The cart and session core of an AR try-on storefront.**
//!
//! A shopper can browse and fill a cart as a guest, sign in, and keep shopping against
//! their server-side cart. This crate owns everything between the screens and the
//! storefront API: who is signed in, where the cart lives, and keeping the two
//! consistent as the session changes.
//!
//! ## Design
//!
//! ### One actor per provider
//! The session provider and the cart store are each an [`ActorEntity`](framework::ActorEntity)
//! driven by a generic [`ResourceActor`](framework::ResourceActor). Operations on one
//! provider are processed strictly one at a time, so two rapid `+1` clicks on a line
//! are applied in click order whatever order their responses come back in.
//!
//! State is published on a `watch` channel after every change, including the
//! `loading = true` edge before a network call. Reads such as
//! [`CartClient::get_cart_item_count`](clients::CartClient::get_cart_item_count) answer
//! from the latest published state and never wait behind an in-flight operation.
//!
//! ### Guest or remote, never both
//! The cart holds one [`CartPersistence`](cart_actor::CartPersistence) at a time:
//! durable local storage for guests, the cart service for signed-in shoppers. Signing
//! in swaps to the server cart; the guest cart stays on disk and comes back on
//! sign-out or when the session expires.
//!
//! ### Session expiry
//! A `401` on a request that carried a bearer token clears the stored tokens inside
//! the gateway and raises [`AuthEvent::SessionExpired`](gateway::AuthEvent). The
//! lifecycle bridge turns that into a session expiry, and the cart follows the session
//! back to guest mode.
//!
//! ### Error handling
//! Each component has its own `thiserror` enum ([`CartError`](cart_actor::CartError),
//! [`SessionError`](session_actor::SessionError), [`GatewayError`](gateway::GatewayError),
//! [`StorageError`](storage::StorageError)). The clients recover the entity's typed
//! error from the framework's boxed one, so callers can match on it.
//!
//! ## Module Tour
//!
//! - [`framework`]: generic actor, client, state publisher and test mocks
//! - [`model`]: products, cart lines, cart and session read models
//! - [`storage`]: durable key/value store (memory and file backed)
//! - [`gateway`]: remote cart and auth ports, the reqwest adapter and an in-memory fake
//! - [`session_actor`], [`cart_actor`]: the two providers
//! - [`clients`]: typed wrappers handed to callers
//! - [`lifecycle`]: [`StorefrontSystem`](lifecycle::StorefrontSystem) wiring, the
//!   session bridge, shutdown and tracing setup
//! - [`config`]: flags and environment
//!
//! ## Quick Start
//!
//! ```bash
//! # Point at the API and keep state under ./.storefront
//! export STOREFRONT_API_URL=http://127.0.0.1:8000/api/
//! RUST_LOG=info cargo run -- add --product-id 9 --name Aviator --price 1200
//! cargo run -- login --username alice --password secret
//! cargo run -- show
//! ```

pub mod cart_actor;
pub mod clients;
pub mod config;
pub mod framework;
pub mod gateway;
pub mod lifecycle;
pub mod model;
pub mod session_actor;
pub mod storage;
