//! An embedding surface that runs the frame on the same runtime.
//!
//! Used by the demo CLI and the integration tests. Messages still cross as
//! JSON text, so the host side cannot tell it apart from a real frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use super::{port_pair, EmbeddingSurface, HostPort};
use crate::engine::EngineFactory;
use crate::error::{LoginKitError, LoginKitResult};
use crate::frame::{FrameController, ViewRenderer};
use crate::utils::lock;

/// Hosts a [`FrameController`] in-process.
pub struct InProcessSurface {
    factory: Arc<dyn EngineFactory>,
    renderer: Arc<dyn ViewRenderer>,
    visible: AtomicBool,
    assets_path: Mutex<Option<String>>,
    /// Attach generation and the outcome of that attach's handshake.
    controller: Arc<watch::Sender<(u64, Option<LoginKitResult<FrameController>>)>>,
}

impl InProcessSurface {
    /// Creates a surface whose frames use `factory` and draw through `renderer`.
    #[must_use]
    pub fn new(factory: Arc<dyn EngineFactory>, renderer: Arc<dyn ViewRenderer>) -> Self {
        Self {
            factory,
            renderer,
            visible: AtomicBool::new(false),
            assets_path: Mutex::new(None),
            controller: Arc::new(watch::channel((0, None)).0),
        }
    }

    /// The controller of the last attached frame.
    ///
    /// Waits for the handshake if it is still in flight.
    ///
    /// # Errors
    /// Whatever made the frame reject the handshake.
    pub async fn controller(&self) -> LoginKitResult<FrameController> {
        let mut rx = self.controller.subscribe();
        let outcome = rx
            .wait_for(|(_, outcome)| outcome.is_some())
            .await
            .map_err(|_| LoginKitError::ChannelClosed)?
            .1
            .clone();
        outcome.unwrap_or(Err(LoginKitError::ChannelClosed))
    }

    /// Whether the frame is currently shown.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    /// The assets path of the last attach.
    #[must_use]
    pub fn assets_path(&self) -> Option<String> {
        lock(&self.assets_path).clone()
    }
}

impl EmbeddingSurface for InProcessSurface {
    fn attach(&self, assets_path: &str) -> LoginKitResult<HostPort> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| LoginKitError::engine(format!("in-process frame needs a tokio runtime: {e}")))?;
        *lock(&self.assets_path) = Some(assets_path.to_string());
        let mut generation = 0;
        self.controller.send_modify(|(current, outcome)| {
            *current += 1;
            generation = *current;
            *outcome = None;
        });

        let (host, frame) = port_pair();
        let factory = self.factory.clone();
        let renderer = self.renderer.clone();
        let slot = self.controller.clone();
        runtime.spawn(async move {
            let outcome = FrameController::accept(frame, factory, renderer).await;
            if let Err(e) = &outcome {
                log::error!("in-process frame rejected the connection: {e}");
            }
            // Only the latest attach may publish.
            slot.send_if_modified(|(current, slot)| {
                if *current != generation {
                    return false;
                }
                *slot = Some(outcome);
                true
            });
        });
        Ok(host)
    }

    fn show(&self) {
        self.visible.store(true, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.visible.store(false, Ordering::SeqCst);
    }
}
