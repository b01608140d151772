//! Global per-camera commit cooldown

use chrono::NaiveDateTime;

/// When the camera last committed, and under which plate key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CooldownState {
    pub last_committed_at: Option<NaiveDateTime>,
    pub last_committed_key: Option<String>,
}

impl CooldownState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once strictly more than `cooldown_seconds` have passed since the
    /// last commit, or when nothing was committed yet.
    pub fn ready(&self, now: NaiveDateTime, cooldown_seconds: u64) -> bool {
        match self.last_committed_at {
            None => true,
            Some(last) => {
                let elapsed_ms = (now - last).num_milliseconds();
                elapsed_ms > (cooldown_seconds as i64).saturating_mul(1000)
            }
        }
    }

    pub fn mark_committed(&mut self, at: NaiveDateTime, key: impl Into<String>) {
        self.last_committed_at = Some(at);
        self.last_committed_key = Some(key.into());
    }

    /// Point the last-committed key at an operator-corrected plate
    pub fn replace_key(&mut self, key: impl Into<String>) -> Option<String> {
        self.last_committed_key.replace(key.into())
    }
}
