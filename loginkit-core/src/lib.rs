#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

//! `loginkit-core` connects a host application to a sandboxed login frame.
//!
//! The two sides share no memory. The host ([`client`]) attaches an
//! [`transport::EmbeddingSurface`], sends a handshake and from then on only
//! holds opaque [`protocol::AccountId`]s plus snapshots the frame chose to
//! send. The frame ([`frame`]) owns the wallet engine's account objects and
//! runs every wallet record through [`sanitize`] before it crosses.

pub mod client;
pub mod defaults;
pub mod engine;
pub mod ethereum;
pub mod frame;
pub mod logger;
pub mod protocol;
pub mod sanitize;
pub mod transport;

mod error;
pub use error::*;

// private modules
mod utils;

pub use client::{connect, Client, ConnectOptions, UiAccount};
pub use frame::FrameController;

uniffi::setup_scaffolding!("loginkit_core");
