//! The shared vocabulary of the frame boundary.
//!
//! Nothing in here has behavior beyond decoding: the host side lives in
//! [`crate::client`], the frame side in [`crate::frame`].

mod connection;
mod messages;
mod types;

pub use connection::*;
pub use messages::*;
pub use types::*;
