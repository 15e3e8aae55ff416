//! Configuration for connections and game sessions.
//!
//! Both structs follow the same builder shape: `new()`/`Default` gives the
//! production values, `with_*` methods override them.
//!
//! # Example
//!
//! ```
//! use matchday_client::config::{DrawPolicy, SessionConfig};
//! use std::time::Duration;
//!
//! let config = SessionConfig::new()
//!     .with_join_timeout(Duration::from_secs(3))
//!     .with_draw_policy(DrawPolicy::ReturnToLobby);
//! assert_eq!(config.reset_timeout, Duration::from_secs(5));
//! ```

use std::time::Duration;

/// Default delay before an automatic reconnect attempt.
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Default number of consecutive automatic reconnect attempts.
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default capacity of the session event bus.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for closing a transport.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default wait for a `roomJoined` reply.
const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Default wait for a `gameReset` reply.
const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(5);

/// Default wait for a fresh connection before emitting `joinLobby`.
const DEFAULT_CONNECT_WAIT: Duration = Duration::from_secs(1);

/// Default flush window for the leave notification on disconnect.
const DEFAULT_LEAVE_GRACE: Duration = Duration::from_millis(150);

// ── ConnectionConfig ────────────────────────────────────────────────

/// Tuning for the [`ConnectionManager`](crate::manager::ConnectionManager).
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Fixed delay before each automatic reconnect attempt.
    ///
    /// Defaults to **2 seconds**.
    pub reconnect_delay: Duration,
    /// Consecutive automatic reconnects before giving up. `0` disables
    /// auto-reconnect. The counter resets after every successful connect.
    ///
    /// Defaults to **5**.
    pub max_reconnect_attempts: u32,
    /// Time allowed for `Transport::close` during disconnect or shutdown.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ── SessionConfig ───────────────────────────────────────────────────

/// What to do when a draw is agreed and the server's payload does not
/// settle whether play continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawPolicy {
    /// Continue in place when the server pushes a `playing` room with a fresh
    /// grid; otherwise return to the lobby.
    #[default]
    FollowServer,
    /// Always leave the game view for the lobby.
    ReturnToLobby,
    /// Always stay on the game view and wait for the next grid.
    ContinueInPlace,
}

/// Tuning for a [`GameSession`](crate::session::GameSession).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long `join_lobby` waits for `roomJoined` or `error`.
    ///
    /// Defaults to **10 seconds**.
    pub join_timeout: Duration,
    /// How long `reset_game` waits for `gameReset` or `error`.
    ///
    /// Defaults to **5 seconds**.
    pub reset_timeout: Duration,
    /// How long `join_lobby` waits for a connection it had to open itself.
    ///
    /// Defaults to **1 second**.
    pub connect_wait: Duration,
    /// Time given to the best-effort `leaveRoom` before `disconnect` closes
    /// the transport.
    ///
    /// Defaults to **150 ms**.
    pub leave_grace: Duration,
    /// Behaviour after an agreed draw.
    pub draw_policy: DrawPolicy,
    /// Capacity of the [`SessionEvent`](crate::event::SessionEvent) bus.
    /// Lagging subscribers lose the oldest events.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            reset_timeout: DEFAULT_RESET_TIMEOUT,
            connect_wait: DEFAULT_CONNECT_WAIT,
            leave_grace: DEFAULT_LEAVE_GRACE,
            draw_policy: DrawPolicy::default(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }

    #[must_use]
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_connect_wait(mut self, wait: Duration) -> Self {
        self.connect_wait = wait;
        self
    }

    #[must_use]
    pub fn with_leave_grace(mut self, grace: Duration) -> Self {
        self.leave_grace = grace;
        self
    }

    #[must_use]
    pub fn with_draw_policy(mut self, policy: DrawPolicy) -> Self {
        self.draw_policy = policy;
        self
    }

    /// Defaults to **256**. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_defaults() {
        let config = ConnectionConfig::new();
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[test]
    fn session_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.join_timeout, Duration::from_secs(10));
        assert_eq!(config.reset_timeout, Duration::from_secs(5));
        assert_eq!(config.connect_wait, Duration::from_secs(1));
        assert_eq!(config.leave_grace, Duration::from_millis(150));
        assert_eq!(config.draw_policy, DrawPolicy::FollowServer);
        assert_eq!(config.event_channel_capacity, 256);
    }

    #[test]
    fn event_channel_capacity_is_clamped_to_one() {
        let config = SessionConfig::new().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[test]
    fn builder_overrides() {
        let config = ConnectionConfig::new()
            .with_reconnect_delay(Duration::from_millis(10))
            .with_max_reconnect_attempts(0);
        assert_eq!(config.reconnect_delay, Duration::from_millis(10));
        assert_eq!(config.max_reconnect_attempts, 0);
    }
}
