//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use loginkit_core::engine::memory::{MemoryAccount, MemoryEngine};
use loginkit_core::engine::WalletKeyRecord;
use loginkit_core::frame::{FrameController, View, ViewRenderer};
use loginkit_core::transport::{port_pair, EmbeddingSurface, FramePort, HostPort, InProcessSurface};
use loginkit_core::{connect, Client, ConnectOptions, LoginKitError, LoginKitResult};
use serde_json::json;
use tokio::sync::mpsc;

pub const ETH_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
pub const ETH_ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

/// Records every view the frame renders.
#[derive(Default)]
pub struct RecordingRenderer {
    views: Mutex<Vec<View>>,
}

impl RecordingRenderer {
    pub fn views(&self) -> Vec<View> {
        self.views.lock().unwrap().clone()
    }
}

impl ViewRenderer for RecordingRenderer {
    fn render(&self, view: &View) {
        self.views.lock().unwrap().push(view.clone());
    }
}

/// A surface with no frame behind it. Each attach hands the frame's port to
/// the test, which then plays the frame by hand (or stays silent).
pub struct ManualSurface {
    ports: mpsc::UnboundedSender<FramePort>,
    visible: AtomicBool,
}

impl ManualSurface {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FramePort>) {
        let (ports, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                ports,
                visible: AtomicBool::new(false),
            }),
            rx,
        )
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }
}

impl EmbeddingSurface for ManualSurface {
    fn attach(&self, _assets_path: &str) -> LoginKitResult<HostPort> {
        let (host, frame) = port_pair();
        self.ports
            .send(frame)
            .map_err(|_| LoginKitError::ChannelClosed)?;
        Ok(host)
    }

    fn show(&self) {
        self.visible.store(true, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.visible.store(false, Ordering::SeqCst);
    }
}

pub fn eth_record(id: &str) -> WalletKeyRecord {
    WalletKeyRecord {
        wallet_type: "wallet:ethereum".to_string(),
        id: id.to_string(),
        archived: false,
        deleted: false,
        sort_index: 0,
        keys: json!({ "ethereumKey": ETH_KEY })
            .as_object()
            .cloned()
            .unwrap(),
        app_ids: vec!["com.example.dapp".to_string()],
    }
}

/// A host and an in-process frame wired together.
pub struct Session {
    pub engine: Arc<MemoryEngine>,
    pub surface: Arc<InProcessSurface>,
    pub renderer: Arc<RecordingRenderer>,
    pub client: Client,
    pub controller: FrameController,
    pub errors: mpsc::UnboundedReceiver<LoginKitError>,
}

impl Session {
    pub async fn start(hide_keys: bool) -> Self {
        let engine = Arc::new(
            MemoryEngine::new()
                .with_user("alice", true)
                .with_user("bob", false),
        );
        let renderer = Arc::new(RecordingRenderer::default());
        let surface = Arc::new(InProcessSurface::new(engine.clone(), renderer.clone()));
        let (error_tx, errors) = mpsc::unbounded_channel();

        let options = ConnectOptions::new("api-key", "com.example.host")
            .hide_keys(hide_keys)
            .plugin_names(["ethereum"])
            .frame_timeout(Duration::from_secs(5))
            .on_error(move |e| {
                let _ = error_tx.send(e.clone());
            });
        let client = connect(options, surface.clone()).await.unwrap();
        let controller = surface.controller().await.unwrap();

        Self {
            engine,
            surface,
            renderer,
            client,
            controller,
            errors,
        }
    }

    /// Logs `account` in on the frame and waits until the host's mirror has it.
    pub async fn login(&self, account: Arc<MemoryAccount>) -> loginkit_core::UiAccount {
        let id = self.controller.handle_login(account).await.unwrap();
        wait_until(|| self.client.account(&id).is_some()).await;
        self.client.account(&id).unwrap()
    }
}

/// Polls `condition` until it holds, yielding to the runtime between checks.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
