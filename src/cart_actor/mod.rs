//! Cart store: line items, derived total and the guest/remote persistence switch.

mod actions;
pub mod entity;
pub mod error;
pub mod persistence;

pub use actions::*;
pub use entity::*;
pub use error::*;
pub use persistence::*;

use crate::clients::CartClient;
use crate::framework::ResourceActor;

/// Creates a new Cart actor and its client. The actor starts detached.
pub fn new() -> (ResourceActor<CartStore>, CartClient) {
    let (actor, generic_client) = ResourceActor::new(CartStore::new(), 32);
    let client = CartClient::new(generic_client);

    (actor, client)
}
