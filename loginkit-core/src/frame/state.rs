//! Frame-side session state.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::view::{View, ViewRenderer};
use crate::engine::{ContextOptions, EngineFactory, WalletAccount, WalletContext};
use crate::error::{LoginKitError, LoginKitResult};
use crate::protocol::{AccountId, ClientMessage, HandshakeRequest};
use crate::transport::{FrameEnvelope, PortSender};

/// Which screen the frame shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    /// Nothing; the surface may be hidden.
    #[default]
    #[serde(rename = "")]
    Closed,
    /// The login screen.
    Login,
    /// The account management screen.
    Account,
}

/// Sends [`ClientMessage`]s back to the host.
#[derive(Debug, Clone)]
pub struct ClientSink {
    sender: PortSender<FrameEnvelope>,
}

impl ClientSink {
    /// Wraps the frame's outgoing port.
    #[must_use]
    pub const fn new(sender: PortSender<FrameEnvelope>) -> Self {
        Self { sender }
    }

    /// Emits one notification.
    ///
    /// # Errors
    /// [`LoginKitError::Serialization`] or [`LoginKitError::ChannelClosed`].
    pub fn dispatch(&self, message: &ClientMessage) -> LoginKitResult<()> {
        log::debug!("frame -> host: {}", message.message_type());
        let message = serde_json::to_value(message)?;
        self.sender.send(&FrameEnvelope::Notify { message })
    }
}

/// Everything the frame knows about one connected host.
///
/// The frame is the authority for account state; the host only ever sees
/// snapshots derived from this.
pub struct FrameState {
    /// Logged-in accounts by capability handle.
    pub accounts: BTreeMap<AccountId, Arc<dyn WalletAccount>>,
    /// Engine context built at handshake.
    pub context: Arc<dyn WalletContext>,
    /// Session-wide key redaction flag. Fixed at handshake.
    pub hide_keys: bool,
    /// Sequence number of the next minted [`AccountId`].
    pub next_account_id: u64,
    /// Current page.
    pub page: Page,
    /// The account shown on the account page.
    pub page_account: Option<Arc<dyn WalletAccount>>,
    /// Vendor name for the login screens.
    pub vendor_name: String,
    /// Vendor logo for the login screens.
    pub vendor_image_url: String,
    /// Notification sink back to the host.
    pub client: ClientSink,
    /// Rendering hook.
    pub renderer: Arc<dyn ViewRenderer>,
}

impl fmt::Debug for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameState")
            .field("accounts", &self.accounts.keys().collect::<Vec<_>>())
            .field("hide_keys", &self.hide_keys)
            .field("next_account_id", &self.next_account_id)
            .field("page", &self.page)
            .field("vendor_name", &self.vendor_name)
            .finish_non_exhaustive()
    }
}

impl FrameState {
    /// Mints the next account handle. Never returns the same id twice.
    pub fn mint_account_id(&mut self) -> AccountId {
        let id = AccountId::mint(self.next_account_id);
        self.next_account_id += 1;
        id
    }

    /// Looks up a logged-in account.
    ///
    /// # Errors
    /// [`LoginKitError::InvalidAccountId`] if `account_id` is not logged in.
    pub fn account(&self, account_id: &AccountId) -> LoginKitResult<Arc<dyn WalletAccount>> {
        self.accounts
            .get(account_id)
            .cloned()
            .ok_or_else(|| LoginKitError::InvalidAccountId {
                account_id: account_id.clone(),
            })
    }

    /// The view derived from the current navigation state.
    #[must_use]
    pub fn view(&self) -> View {
        View {
            page: self.page,
            account_username: self.page_account.as_ref().map(|account| account.username()),
            vendor_name: self.vendor_name.clone(),
            vendor_image_url: self.vendor_image_url.clone(),
        }
    }

    /// Re-renders through the rendering hook.
    pub fn update_view(&self) {
        self.renderer.render(&self.view());
    }
}

/// Builds the initial state for a handshake.
///
/// # Errors
/// Propagates engine failures from [`EngineFactory::make_context`].
pub async fn make_frame_state(
    request: &HandshakeRequest,
    factory: &dyn EngineFactory,
    client: ClientSink,
    renderer: Arc<dyn ViewRenderer>,
) -> LoginKitResult<FrameState> {
    let context = factory
        .make_context(&ContextOptions {
            api_key: request.api_key.clone(),
            app_id: request.app_id.clone(),
            plugin_names: request.plugin_names.clone().unwrap_or_default(),
        })
        .await?;

    Ok(FrameState {
        accounts: BTreeMap::new(),
        context,
        hide_keys: request.hide_keys,
        next_account_id: 0,
        page: Page::Closed,
        page_account: None,
        vendor_name: request.vendor_name.clone().unwrap_or_default(),
        vendor_image_url: request.vendor_image_url.clone().unwrap_or_default(),
        client,
        renderer,
    })
}
