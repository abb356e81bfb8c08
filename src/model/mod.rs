//! Pure data structures (DTOs) shared by the providers, the gateway and durable storage.

pub mod cart;
pub mod product;
pub mod user;

pub use cart::*;
pub use product::*;
pub use user::*;
