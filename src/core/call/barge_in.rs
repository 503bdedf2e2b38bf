use std::time::Duration;

use crate::core::audio::peak_level;

/// Default grace period after playback starts.
pub const DEFAULT_BARGE_IN_GRACE: Duration = Duration::from_millis(600);

/// Whether caller audio may interrupt the agent mid-reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BargeInPolicy {
    /// Inbound audio during playback never interrupts
    Disabled,
    /// Inbound audio interrupts once `grace` has passed since playback
    /// started. `min_level` gates on peak linear amplitude; 0 accepts any
    /// audio.
    GracePeriod { grace: Duration, min_level: u16 },
}

impl Default for BargeInPolicy {
    fn default() -> Self {
        Self::GracePeriod {
            grace: DEFAULT_BARGE_IN_GRACE,
            min_level: 0,
        }
    }
}

impl BargeInPolicy {
    pub fn from_settings(enabled: bool, grace: Duration, min_level: u16) -> Self {
        if enabled {
            Self::GracePeriod { grace, min_level }
        } else {
            Self::Disabled
        }
    }

    /// Decide whether μ-law `payload` arriving `elapsed` after playback
    /// started should abort it.
    pub fn should_interrupt(&self, elapsed: Duration, payload: &[u8]) -> bool {
        match *self {
            Self::Disabled => false,
            Self::GracePeriod { grace, min_level } => {
                if elapsed < grace {
                    return false;
                }
                min_level == 0 || peak_level(payload) >= min_level
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::{MULAW_SILENCE, linear_to_ulaw};

    const QUIET: [u8; 160] = [MULAW_SILENCE; 160];

    #[test]
    fn test_grace_period_boundary() {
        let policy = BargeInPolicy::default();
        assert!(!policy.should_interrupt(Duration::from_millis(500), &QUIET));
        assert!(policy.should_interrupt(Duration::from_millis(600), &QUIET));
        assert!(policy.should_interrupt(Duration::from_millis(700), &QUIET));
    }

    #[test]
    fn test_disabled_never_interrupts() {
        let policy = BargeInPolicy::from_settings(false, DEFAULT_BARGE_IN_GRACE, 0);
        assert_eq!(policy, BargeInPolicy::Disabled);
        assert!(!policy.should_interrupt(Duration::from_secs(30), &QUIET));
    }

    #[test]
    fn test_loudness_gate() {
        let policy = BargeInPolicy::GracePeriod {
            grace: Duration::ZERO,
            min_level: 2000,
        };
        assert!(!policy.should_interrupt(Duration::from_secs(1), &QUIET));
        let loud = vec![linear_to_ulaw(8000); 160];
        assert!(policy.should_interrupt(Duration::from_secs(1), &loud));
    }
}
