use std::time::Duration;

/// How long [`crate::client::connect`] waits for the handshake reply.
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Where the frame assets for this release are hosted.
#[must_use]
pub fn default_assets_path() -> String {
    format!(
        "https://developer.airbitz.co/iframe/v{}/",
        env!("CARGO_PKG_VERSION")
    )
}
