//! Client configuration.

use std::time::Duration;

/// Tunables for a [`Client`](crate::Client).
///
/// The defaults are sensible for a queue client; most applications use
/// `Config::default()` unchanged.
#[derive(Debug, Clone)]
pub struct Config {
    /// Size of a single socket read handed to the session.
    pub read_chunk: usize,

    /// Slots the message table starts with. The table grows on demand.
    pub initial_messages: usize,

    /// Cap on an inbound payload or queue-name argument. Exceeding it is a
    /// protocol violation.
    pub max_payload: usize,

    /// Delay before the first reconnect attempt of a controller that has
    /// failed at least once. Doubles per attempt up to
    /// [`reconnect_ivl_max`](Self::reconnect_ivl_max).
    pub reconnect_ivl: Duration,

    /// Ceiling for the reconnect backoff.
    pub reconnect_ivl_max: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            read_chunk: 8192,
            initial_messages: 16,
            max_payload: 64 * 1024 * 1024,
            reconnect_ivl: Duration::from_millis(100),
            reconnect_ivl_max: Duration::from_secs(10),
        }
    }
}

impl Config {
    #[must_use]
    pub fn with_read_chunk(mut self, bytes: usize) -> Self {
        self.read_chunk = bytes;
        self
    }

    #[must_use]
    pub fn with_initial_messages(mut self, slots: usize) -> Self {
        self.initial_messages = slots;
        self
    }

    #[must_use]
    pub fn with_max_payload(mut self, bytes: usize) -> Self {
        self.max_payload = bytes;
        self
    }

    #[must_use]
    pub fn with_reconnect_ivl(mut self, ivl: Duration) -> Self {
        self.reconnect_ivl = ivl;
        self
    }

    #[must_use]
    pub fn with_reconnect_ivl_max(mut self, ivl: Duration) -> Self {
        self.reconnect_ivl_max = ivl;
        self
    }
}
