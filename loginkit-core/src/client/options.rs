//! Connection options and host callbacks.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::account::UiAccount;
use crate::defaults::{default_assets_path, DEFAULT_FRAME_TIMEOUT};
use crate::error::LoginKitError;
use crate::protocol::HandshakeRequest;

/// Called when the frame asks to be closed.
pub type CloseCallback = Arc<dyn Fn() + Send + Sync>;

/// Called with errors reported by the frame or raised by the connection.
pub type ErrorCallback = Arc<dyn Fn(&LoginKitError) + Send + Sync>;

/// Called with the account handle after a login.
pub type LoginCallback = Arc<dyn Fn(UiAccount) + Send + Sync>;

/// Logs the error. Used when the host installs no error callback.
pub fn log_error(error: &LoginKitError) {
    log::error!("login frame error: {error}");
}

/// Options for [`super::connect`].
#[derive(Clone)]
pub struct ConnectOptions {
    /// API key for the wallet engine.
    pub api_key: String,
    /// Application id for the wallet engine.
    pub app_id: String,
    /// Where the frame assets live.
    pub assets_path: String,
    /// Whether the frame redacts wallet keys for this session.
    pub hide_keys: bool,
    /// Handshake deadline.
    pub frame_timeout: Duration,
    /// Currency plugins the frame should load.
    pub plugin_names: Option<Vec<String>>,
    /// Vendor name shown on the login screens.
    pub vendor_name: Option<String>,
    /// Vendor logo shown on the login screens.
    pub vendor_image_url: Option<String>,
    /// Error callback; defaults to [`log_error`].
    pub on_error: ErrorCallback,
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("app_id", &self.app_id)
            .field("assets_path", &self.assets_path)
            .field("hide_keys", &self.hide_keys)
            .field("frame_timeout", &self.frame_timeout)
            .field("plugin_names", &self.plugin_names)
            .field("vendor_name", &self.vendor_name)
            .finish_non_exhaustive()
    }
}

impl ConnectOptions {
    /// Options with every default applied.
    #[must_use]
    pub fn new(api_key: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            app_id: app_id.into(),
            assets_path: default_assets_path(),
            hide_keys: false,
            frame_timeout: DEFAULT_FRAME_TIMEOUT,
            plugin_names: None,
            vendor_name: None,
            vendor_image_url: None,
            on_error: Arc::new(log_error),
        }
    }

    /// Sets where the frame assets are loaded from.
    #[must_use]
    pub fn assets_path(mut self, assets_path: impl Into<String>) -> Self {
        self.assets_path = assets_path.into();
        self
    }

    /// Requests key redaction for the whole session.
    #[must_use]
    pub const fn hide_keys(mut self, hide_keys: bool) -> Self {
        self.hide_keys = hide_keys;
        self
    }

    /// Sets the handshake deadline.
    #[must_use]
    pub const fn frame_timeout(mut self, frame_timeout: Duration) -> Self {
        self.frame_timeout = frame_timeout;
        self
    }

    /// Sets the currency plugins to load.
    #[must_use]
    pub fn plugin_names<I, S>(mut self, plugin_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plugin_names = Some(plugin_names.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the vendor branding.
    #[must_use]
    pub fn vendor(mut self, name: impl Into<String>, image_url: Option<String>) -> Self {
        self.vendor_name = Some(name.into());
        self.vendor_image_url = image_url;
        self
    }

    /// Installs the error callback.
    #[must_use]
    pub fn on_error(mut self, on_error: impl Fn(&LoginKitError) + Send + Sync + 'static) -> Self {
        self.on_error = Arc::new(on_error);
        self
    }

    /// The handshake these options produce.
    #[must_use]
    pub fn handshake(&self) -> HandshakeRequest {
        HandshakeRequest {
            api_key: self.api_key.clone(),
            app_id: self.app_id.clone(),
            hide_keys: self.hide_keys,
            plugin_names: self.plugin_names.clone(),
            vendor_name: self.vendor_name.clone(),
            vendor_image_url: self.vendor_image_url.clone(),
        }
    }
}

/// Callbacks for [`super::Client::open_login_window`].
#[derive(Clone, Default)]
pub struct LoginWindowOptions {
    /// Called after a login.
    pub on_login: Option<LoginCallback>,
    /// Called when the window closes.
    pub on_close: Option<CloseCallback>,
}

impl LoginWindowOptions {
    /// Sets the login callback.
    #[must_use]
    pub fn on_login(mut self, on_login: impl Fn(UiAccount) + Send + Sync + 'static) -> Self {
        self.on_login = Some(Arc::new(on_login));
        self
    }

    /// Sets the close callback.
    #[must_use]
    pub fn on_close(mut self, on_close: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(on_close));
        self
    }
}
