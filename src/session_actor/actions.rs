//! Operations understood by the session actor.

use crate::model::{Credentials, Registration, UserPatch};

#[derive(Debug, Clone)]
pub enum SessionAction {
    /// Validates a stored access token against the profile endpoint.
    Restore,
    Login(Credentials),
    Register(Registration),
    /// Always ends unauthenticated, even if the server call fails.
    Logout,
    /// Replaces the cached user without a server call.
    UpdateUser(UserPatch),
    /// Saves the patch upstream, then caches the returned user.
    UpdateProfile(UserPatch),
    /// The bearer token was rejected somewhere; drop the session.
    Expire,
}
