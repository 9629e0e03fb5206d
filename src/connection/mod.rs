//! Bridge connection handle, manager, and the shared context

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::Stream;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::WatchStream;

use crate::BridgeConfig;
use crate::driver::Command;
use crate::types::ConnectionStatus;

pub mod context;
pub mod manager;


pub use context::{ConnectionContext, LinkState};
pub use manager::ConnectionManager;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Shared handle to one bridge connection
///
/// Cloning is cheap. Clones can observe the connection and create
/// subscriptions, but only the [`ConnectionManager`] that created it can end
/// its lifecycle.
#[derive(Clone)]
pub struct BridgeConnection {
    inner: Arc<Inner>,
}

struct Inner {
    id: u64,
    config: BridgeConfig,
    status: watch::Receiver<ConnectionStatus>,
    commands: mpsc::UnboundedSender<Command>,
    next_subscription: AtomicU64,
}

impl BridgeConnection {
    pub(crate) fn new(
        config: BridgeConfig,
        status: watch::Receiver<ConnectionStatus>,
        commands: mpsc::UnboundedSender<Command>,
    ) -> Self {
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            inner: Arc::new(Inner {
                id,
                config,
                status,
                commands,
                next_subscription: AtomicU64::new(1),
            }),
        }
    }

    /// Process-unique connection id
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn url(&self) -> &str {
        &self.inner.config.url
    }

    pub fn domain_id(&self) -> Option<&str> {
        self.inner.config.domain_id.as_deref()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.inner.status.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Current status first, then every transition
    pub fn status_updates(&self) -> impl Stream<Item = ConnectionStatus> + 'static {
        WatchStream::new(self.inner.status.clone())
    }

    /// Wait until the connection leaves `Connecting`
    pub async fn settled(&self) -> ConnectionStatus {
        let mut status = self.inner.status.clone();
        match status.wait_for(|s| *s != ConnectionStatus::Connecting).await {
            Ok(settled) => *settled,
            // Driver gone without reporting; nothing is live anymore
            Err(_) => ConnectionStatus::Disconnected,
        }
    }

    /// Wait until the connection reaches a terminal state
    pub async fn ended(&self) -> ConnectionStatus {
        let mut status = self.inner.status.clone();
        match status.wait_for(|s| s.is_terminal()).await {
            Ok(ended) => *ended,
            Err(_) => ConnectionStatus::Disconnected,
        }
    }

    pub(crate) fn next_subscription_id(&self, topic: &str) -> String {
        let n = self.inner.next_subscription.fetch_add(1, Ordering::Relaxed);
        format!("subscribe:{}:{}:{}", topic, self.inner.id, n)
    }

    /// Returns false when the driver has already shut down
    pub(crate) fn send_command(&self, command: Command) -> bool {
        self.inner.commands.send(command).is_ok()
    }
}

impl fmt::Debug for BridgeConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConnection")
            .field("id", &self.inner.id)
            .field("url", &self.inner.config.url)
            .field("domain_id", &self.inner.config.domain_id)
            .field("status", &self.status())
            .finish()
    }
}

impl PartialEq for BridgeConnection {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for BridgeConnection {}
