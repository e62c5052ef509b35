//! Foreign-language entry point for `loginkit-core`.

pub use loginkit_core::*;

loginkit_core::uniffi_reexport_scaffolding!();
