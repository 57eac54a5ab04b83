use std::sync::atomic::{AtomicBool, Ordering};

/// What the heartbeat loop should do at a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatTick {
    /// The connection answered since the last tick; send the next ping.
    SendPing,
    /// No pong arrived within the interval; stop pinging and close.
    ConnectionDead,
}

/// Per-connection liveness flag.
///
/// The flag starts true. Each tick consumes it: a tick that finds it unset
/// means the peer missed a whole interval. A pong at any point re-arms it.
#[derive(Debug)]
pub struct Heartbeat {
    alive: AtomicBool,
}

impl Heartbeat {
    pub fn new() -> Self {
        Self {
            alive: AtomicBool::new(true),
        }
    }

    pub fn pong_received(&self) {
        self.alive.store(true, Ordering::Release);
    }

    pub fn tick(&self) -> HeartbeatTick {
        if self.alive.swap(false, Ordering::AcqRel) {
            HeartbeatTick::SendPing
        } else {
            HeartbeatTick::ConnectionDead
        }
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}
