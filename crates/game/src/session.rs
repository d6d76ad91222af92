//! Session phase and per-session statistics.

use std::time::Duration;

/// Coarse session state. Gameplay only advances while `Running`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    NotStarted,
    Running,
    /// Player died. Frozen until a restart.
    GameOver,
}

/// Counters for the current session. Reset on restart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    /// Incremented exactly once per hostile death.
    pub kills: u32,
    pub shots_fired: u32,
    pub shots_hit: u32,
    pub damage_taken: f32,
    pub time_survived: Duration,
}

impl SessionStats {
    /// Fraction of fired shots that hit a hostile, 0 when nothing was fired.
    pub fn accuracy(&self) -> f32 {
        if self.shots_fired == 0 {
            0.0
        } else {
            self.shots_hit as f32 / self.shots_fired as f32
        }
    }

    /// Format time survived as MM:SS.
    pub fn time_survived_str(&self) -> String {
        let total = self.time_survived.as_secs();
        format!("{:02}:{:02}", total / 60, total % 60)
    }
}
