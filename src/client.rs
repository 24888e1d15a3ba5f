//! The client context shared by every device handle.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use uuid::Uuid;

use crate::animation::Registry;
use crate::config::LanConfig;
use crate::errors::Error;
use crate::history::MessageHistory;
use crate::runtime::Mutex;
use crate::transport::Connection;

type Result<T> = std::result::Result<T, Error>;

/// A LAN client: one socket, one source id and the animations it runs.
///
/// Cloning is cheap; clones share the connection. Device handles keep a
/// clone, so the socket stays open as long as any handle is alive.
///
/// ```no_run
/// use lifx_lan_rs::{LanClient, LanConfig};
///
/// # async fn run() -> Result<(), lifx_lan_rs::Error> {
/// let client = LanClient::bind(LanConfig::default()).await?;
/// for found in client.discover().await? {
///     println!("{} at {}", found.target, found.address);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LanClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: LanConfig,
    connection: Connection,
    animations: Mutex<Registry>,
}

impl LanClient {
    /// Bind a socket as described by `config`.
    pub async fn bind(config: LanConfig) -> Result<LanClient> {
        let source = config.source.unwrap_or_else(random_source);
        let connection = Connection::bind(&config, source).await?;
        debug!(
            "client bound to {} (broadcast {})",
            connection.local_addr(),
            config.broadcast_target()
        );
        Ok(LanClient {
            inner: Arc::new(ClientInner {
                config,
                connection,
                animations: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn config(&self) -> &LanConfig {
        &self.inner.config
    }

    /// The source id stamped on every request.
    pub fn source(&self) -> u32 {
        self.inner.connection.source()
    }

    pub async fn history(&self) -> MessageHistory {
        self.inner.connection.history().await
    }

    pub async fn clear_history(&self) {
        self.inner.connection.clear_history().await;
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    pub(crate) fn animations(&self) -> &Mutex<Registry> {
        &self.inner.animations
    }
}

/// A random non-zero source id.
fn random_source() -> u32 {
    let bytes = Uuid::new_v4().into_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]).max(1)
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddr};

    use super::*;

    fn local_config() -> LanConfig {
        LanConfig {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fixed_source() {
        let client = LanClient::bind(LanConfig {
            source: Some(42),
            ..local_config()
        })
        .await
        .unwrap();
        assert_eq!(client.source(), 42);
        assert_eq!(client.clone().source(), 42);
    }

    #[tokio::test]
    async fn test_random_sources_differ() {
        let a = LanClient::bind(local_config()).await.unwrap();
        let b = LanClient::bind(local_config()).await.unwrap();
        assert_ne!(a.source(), 0);
        assert_ne!(a.source(), b.source());
    }
}
