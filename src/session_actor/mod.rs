//! Session provider: the signed-in user and the bearer tokens behind it.
//!
//! State machine:
//!
//! ```text
//! Initializing --restore--> Unauthenticated | Authenticated
//! Unauthenticated --login/register--> Authenticating --> Authenticated | Unauthenticated + error
//! Authenticated --logout/expire--> Unauthenticated
//! ```

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use entity::*;
pub use error::*;

use crate::clients::SessionClient;
use crate::framework::ResourceActor;

/// Creates a new Session actor and its client. The session starts `Initializing`.
pub fn new() -> (ResourceActor<Session>, SessionClient) {
    let (actor, generic_client) = ResourceActor::new(Session::new(), 32);
    let client = SessionClient::new(generic_client);

    (actor, client)
}
