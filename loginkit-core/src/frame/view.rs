//! Rendering hook.
//!
//! The frame does not draw anything itself. After every navigation change it
//! hands a [`View`] to the platform's [`ViewRenderer`], which shows the login
//! or account screen and feeds user events back through
//! [`super::FrameController::handle_login`], [`super::FrameController::handle_close`]
//! and [`super::FrameController::handle_error`].

use super::state::Page;

/// What the frame should currently show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    /// Current page.
    pub page: Page,
    /// Username of the account being managed, on the account page.
    pub account_username: Option<String>,
    /// Vendor name from the handshake.
    pub vendor_name: String,
    /// Vendor logo from the handshake.
    pub vendor_image_url: String,
}

/// Draws the frame's screens.
pub trait ViewRenderer: Send + Sync {
    /// Replaces whatever is on screen with `view`.
    fn render(&self, view: &View);
}

/// Renderer that draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl ViewRenderer for NullRenderer {
    fn render(&self, view: &View) {
        log::trace!("render {:?}", view.page);
    }
}
