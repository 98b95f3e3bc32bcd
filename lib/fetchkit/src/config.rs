//! Connection settings for the hyper transport.

use std::time::Duration;

/// Settings applied when [`HyperTransport`](crate::HyperTransport) builds its
/// connector and pool.
///
/// Request timeouts belong to [`Fetch`](crate::Fetch) and [`Call`](crate::Call),
/// not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Bound on establishing a TCP connection.
    pub connect_timeout: Duration,
    /// Idle connections kept per host.
    pub pool_idle_per_host: usize,
    /// Idle connections older than this are closed.
    pub pool_idle_timeout: Duration,
    /// Resend a request the pool dropped before writing it.
    pub retry_canceled_requests: bool,
    /// `TCP_NODELAY` on new sockets.
    pub tcp_nodelay: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            retry_canceled_requests: true,
            tcp_nodelay: true,
        }
    }
}

impl ClientConfig {
    /// Start from the defaults.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ClientConfig`].
///
/// ```
/// use std::time::Duration;
/// use fetchkit::{ClientConfig, Fetch};
///
/// let config = ClientConfig::builder()
///     .connect_timeout(Duration::from_secs(2))
///     .pool_idle_per_host(4)
///     .build();
/// let fetch = Fetch::builder().client_config(config).build();
/// assert!(fetch.is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// See [`ClientConfig::connect_timeout`].
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// See [`ClientConfig::pool_idle_per_host`].
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config.pool_idle_per_host = count;
        self
    }

    /// See [`ClientConfig::pool_idle_timeout`].
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    /// See [`ClientConfig::retry_canceled_requests`].
    #[must_use]
    pub const fn retry_canceled_requests(mut self, retry: bool) -> Self {
        self.config.retry_canceled_requests = retry;
        self
    }

    /// See [`ClientConfig::tcp_nodelay`].
    #[must_use]
    pub const fn tcp_nodelay(mut self, nodelay: bool) -> Self {
        self.config.tcp_nodelay = nodelay;
        self
    }

    /// Finish.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
