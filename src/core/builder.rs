use std::time::Duration;

use crate::proto::error::{Error, Result};

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default server port.
pub const DEFAULT_PORT: u16 = 6379;
/// Default socket read buffer size in bytes.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;
/// Default socket write buffer size in bytes; also the batching threshold.
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 4096;
/// Default capacity of the await-write queue.
pub const DEFAULT_REQUEST_QUEUE_SIZE: usize = 1024;
/// Default capacity of the await-read queue.
pub const DEFAULT_RESPONSE_QUEUE_SIZE: usize = 1024;
/// Default heartbeat period.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(1);

/// Connection configuration.
///
/// Built once and read-only afterwards; every connection keeps its own copy.
/// No validation happens here: a bad host or an unreachable server surfaces
/// when a connection is opened.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use pipedis::ConnectionSpec;
///
/// let spec = ConnectionSpec::new()
///     .host("10.0.0.5")
///     .port(6380)
///     .password("secret")
///     .db(2)
///     .heartbeat(Duration::ZERO);
/// assert_eq!(spec.addr(), "10.0.0.5:6380");
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionSpec {
    host: String,
    port: u16,
    password: Option<String>,
    db: u32,
    read_buffer_size: usize,
    write_buffer_size: usize,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    keepalive: bool,
    linger: Option<Duration>,
    nodelay: bool,
    request_queue_size: usize,
    response_queue_size: usize,
    heartbeat: Duration,
}

impl Default for ConnectionSpec {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            password: None,
            db: 0,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            read_timeout: None,
            write_timeout: None,
            connect_timeout: None,
            keepalive: true,
            linger: Some(Duration::ZERO),
            nodelay: true,
            request_queue_size: DEFAULT_REQUEST_QUEUE_SIZE,
            response_queue_size: DEFAULT_RESPONSE_QUEUE_SIZE,
            heartbeat: DEFAULT_HEARTBEAT,
        }
    }
}

impl ConnectionSpec {
    /// Creates a spec with all defaults.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `redis://[:password@]host[:port][/db]` URL.
    ///
    /// Fields not present in the URL keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a malformed URL, a scheme other
    /// than `redis`, or a non-numeric database path.
    pub fn from_url(address: &str) -> Result<Self> {
        let parsed_url = url::Url::parse(address)
            .map_err(|_| Error::invalid_argument("invalid address format"))?;

        if parsed_url.scheme() != "redis" {
            return Err(Error::invalid_argument(
                "invalid scheme, expected redis://",
            ));
        }

        let host = parsed_url
            .host_str()
            .ok_or_else(|| Error::invalid_argument("missing host in address"))?;

        let mut spec = Self::new()
            .host(host)
            .port(parsed_url.port().unwrap_or(DEFAULT_PORT));

        if let Some(password) = parsed_url.password() {
            spec = spec.password(password);
        }

        let path = parsed_url.path().trim_start_matches('/');
        if !path.is_empty() {
            let db = path
                .parse::<u32>()
                .map_err(|_| Error::invalid_argument(format!("invalid database {:?}", path)))?;
            spec = spec.db(db);
        }

        Ok(spec)
    }

    /// Sets the server host.
    #[inline]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the server port.
    #[inline]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the password; AUTH is issued on connect when set.
    #[inline]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the database; SELECT is issued on connect when non-zero.
    #[inline]
    pub fn db(mut self, db: u32) -> Self {
        self.db = db;
        self
    }

    /// Sets the read buffer size in bytes.
    #[inline]
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Sets the write buffer size in bytes.
    ///
    /// The pipelined connection also uses this as its batching threshold.
    #[inline]
    pub fn write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }

    /// Sets the read timeout. `None` means no timeout.
    #[inline]
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the write timeout. `None` means no timeout.
    #[inline]
    pub fn write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Sets the connect timeout. `None` means no timeout.
    #[inline]
    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enables or disables TCP keepalive.
    #[inline]
    pub fn keepalive(mut self, enabled: bool) -> Self {
        self.keepalive = enabled;
        self
    }

    /// Sets `SO_LINGER`. `None` leaves the OS default.
    #[inline]
    pub fn linger(mut self, linger: Option<Duration>) -> Self {
        self.linger = linger;
        self
    }

    /// Enables or disables `TCP_NODELAY`.
    #[inline]
    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.nodelay = enabled;
        self
    }

    /// Sets the capacity of the await-write queue.
    #[inline]
    pub fn request_queue_size(mut self, size: usize) -> Self {
        self.request_queue_size = size;
        self
    }

    /// Sets the capacity of the await-read queue.
    #[inline]
    pub fn response_queue_size(mut self, size: usize) -> Self {
        self.response_queue_size = size;
        self
    }

    /// Sets the heartbeat period. [`Duration::ZERO`] disables the heartbeat.
    #[inline]
    pub fn heartbeat(mut self, period: Duration) -> Self {
        self.heartbeat = period;
        self
    }

    /// `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Server host.
    pub fn get_host(&self) -> &str {
        &self.host
    }

    /// Server port.
    pub fn get_port(&self) -> u16 {
        self.port
    }

    /// Password, if any.
    pub fn get_password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Database index.
    pub fn get_db(&self) -> u32 {
        self.db
    }

    /// Read buffer size in bytes.
    pub fn get_read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    /// Write buffer size in bytes.
    pub fn get_write_buffer_size(&self) -> usize {
        self.write_buffer_size
    }

    /// Read timeout.
    pub fn get_read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Write timeout.
    pub fn get_write_timeout(&self) -> Option<Duration> {
        self.write_timeout
    }

    /// Connect timeout.
    pub fn get_connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Whether TCP keepalive is on.
    pub fn get_keepalive(&self) -> bool {
        self.keepalive
    }

    /// `SO_LINGER` setting.
    pub fn get_linger(&self) -> Option<Duration> {
        self.linger
    }

    /// Whether `TCP_NODELAY` is on.
    pub fn get_nodelay(&self) -> bool {
        self.nodelay
    }

    /// Await-write queue capacity.
    pub fn get_request_queue_size(&self) -> usize {
        self.request_queue_size
    }

    /// Await-read queue capacity.
    pub fn get_response_queue_size(&self) -> usize {
        self.response_queue_size
    }

    /// Heartbeat period; zero when disabled.
    pub fn get_heartbeat(&self) -> Duration {
        self.heartbeat
    }
}
