//! Navigation state machine driven by [`FrameMessage`]s.

use std::sync::Arc;

use super::state::{FrameState, Page};
use crate::engine::WalletAccount;
use crate::error::LoginKitResult;
use crate::protocol::FrameMessage;

/// Work left to do after the state lock is released.
pub enum Followup {
    /// Nothing.
    None,
    /// Tear down an account that was just removed from the state.
    Logout(Arc<dyn WalletAccount>),
}

/// Applies a host message to the frame state.
///
/// Navigation changes re-render immediately. A `logout` removes the account
/// from the state and hands it back so its teardown can run unlocked.
///
/// # Errors
/// [`crate::error::LoginKitError::InvalidAccountId`] when the message names an
/// account that is not logged in. The state is left untouched in that case.
pub fn frame_dispatch(state: &mut FrameState, message: FrameMessage) -> LoginKitResult<Followup> {
    match message {
        FrameMessage::Logout(payload) => {
            let account = state.account(&payload.account_id)?;
            state.accounts.remove(&payload.account_id);
            Ok(Followup::Logout(account))
        }
        FrameMessage::OpenLoginWindow => {
            state.page = Page::Login;
            state.page_account = None;
            state.update_view();
            Ok(Followup::None)
        }
        FrameMessage::OpenManageWindow(payload) => {
            let account = state.account(&payload.account_id)?;
            state.page = Page::Account;
            state.page_account = Some(account);
            state.update_view();
            Ok(Followup::None)
        }
    }
}

/// The user dismissed the frame.
pub fn handle_close(state: &mut FrameState) {
    state.page = Page::Closed;
    state.update_view();
}
