//! Authoritative engine bookkeeping: engine id discovery and the ±150s
//! time-window check (RFC 3414 §3.2 step 7).

use std::time::Instant;

use crate::error::UsmError;

/// Acceptable clock skew between our last-known `engineTime` and an
/// incoming message's claimed `engineTime`.
pub const TIME_WINDOW_SECS: i64 = 150;

/// What we know about a remote authoritative SNMP engine, refreshed by the
/// discovery exchange.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub engine_id: Vec<u8>,
    pub engine_boots: u32,
    pub engine_time: u32,
    pub synced_at: Instant,
}

impl EngineState {
    pub fn new(engine_id: Vec<u8>, engine_boots: u32, engine_time: u32) -> Self {
        EngineState { engine_id, engine_boots, engine_time, synced_at: Instant::now() }
    }

    /// Our best estimate of the engine's current `engineTime`, projected
    /// forward from the last sync using the local monotonic clock.
    pub fn estimated_time(&self) -> u32 {
        let elapsed = self.synced_at.elapsed().as_secs();
        self.engine_time.saturating_add(elapsed as u32)
    }

    pub fn update(&mut self, engine_boots: u32, engine_time: u32) {
        self.engine_boots = engine_boots;
        self.engine_time = engine_time;
        self.synced_at = Instant::now();
    }

    /// RFC 3414 §3.2 step 7: a message is in the time window when boots
    /// match and the time difference is within ±150s, unless our boots
    /// counter is behind (then the remote is authoritative and we resync).
    pub fn check_time_window(&self, msg_boots: u32, msg_time: u32) -> Result<(), UsmError> {
        if msg_boots != self.engine_boots {
            return Err(UsmError::NotInTimeWindow);
        }
        let ours = self.estimated_time() as i64;
        let theirs = msg_time as i64;
        if (ours - theirs).abs() > TIME_WINDOW_SECS {
            return Err(UsmError::NotInTimeWindow);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_within_window() {
        let state = EngineState::new(vec![1, 2, 3], 4, 1000);
        assert!(state.check_time_window(4, 1000).is_ok());
    }

    #[test]
    fn mismatched_boots_rejected() {
        let state = EngineState::new(vec![1, 2, 3], 4, 1000);
        assert!(state.check_time_window(5, 1000).is_err());
    }

    #[test]
    fn time_outside_window_rejected() {
        let state = EngineState::new(vec![1, 2, 3], 4, 1000);
        assert!(state.check_time_window(4, 1000 + TIME_WINDOW_SECS as u32 + 1).is_err());
    }
}
