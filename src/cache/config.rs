//! Stream cache configuration

use std::time::Duration;

/// When a shared connection is torn down as consumers detach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TeardownPolicy {
    /// Close once the last consumer detaches
    #[default]
    RefCounted,
    /// Close as soon as any consumer detaches; the rest observe `Closed`
    FirstDetach,
}

/// Stream cache configuration options
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Events buffered per entry before slow consumers start skipping
    pub broadcast_capacity: usize,

    /// Transport events buffered between socket and pump
    pub transport_buffer: usize,

    /// Detach behaviour
    pub teardown: TeardownPolicy,

    /// Tear a connection down after this long without any transport event
    pub idle_timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 64,
            transport_buffer: 256,
            teardown: TeardownPolicy::RefCounted,
            idle_timeout: None,
        }
    }
}

impl CacheConfig {
    /// Set broadcast capacity (minimum 1)
    pub fn broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity.max(1);
        self
    }

    /// Set transport buffer size (minimum 1)
    pub fn transport_buffer(mut self, size: usize) -> Self {
        self.transport_buffer = size.max(1);
        self
    }

    /// Set teardown policy
    pub fn teardown(mut self, policy: TeardownPolicy) -> Self {
        self.teardown = policy;
        self
    }

    /// Set idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }
}
