//! # Observability & Tracing
//!
//! [`setup_tracing`] installs the `tracing` subscriber used by the `storefront` binary.
//! Libraries and tests never install one; they only emit events.
//!
//! ## Configuration
//!
//! The level comes from `RUST_LOG`. The compact format hides the module prefix
//! (`with_target(false)`); actor events carry an `entity_type` field instead.
//!
//! ```bash
//! # Transitions and failures
//! RUST_LOG=info storefront show
//!
//! # Every request, action payload and reconcile
//! RUST_LOG=debug storefront add --product-id 9 --name Aviator --price 1200
//!
//! # Only the gateway
//! RUST_LOG=storefront_sync::gateway=debug storefront show
//! ```
//!
//! ## What Gets Traced
//!
//! - **Actor lifecycle**: `Actor started`, `Shutdown`, with `entity_type=CartStore` or `Session`
//! - **Operations**: one `Action ok` / `Action failed` per queued operation
//! - **Cart**: mode switches (`from`, `to`), line changes (`product_id`, `item_id`, `quantity`)
//! - **Session**: sign-in (`user_id`), sign-out, expiry
//! - **Gateway**: each request's method and URL at `debug`, rejected tokens at `warn`
//!
//! With `RUST_LOG=info` a guest adding a frame and then signing in reads:
//!
//! ```text
//! INFO Actor started entity_type="Session"
//! INFO Actor started entity_type="CartStore"
//! INFO No stored session
//! INFO Switching cart mode from=detached to=guest
//! INFO add_item{product_id=9}: Adding to cart product_id=9 quantity=1
//! INFO Signed in user_id=1
//! INFO Switching cart mode from=guest to=remote
//! ```
pub fn setup_tracing() {
    // A second call (or a host that already set a subscriber) keeps the existing one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}
