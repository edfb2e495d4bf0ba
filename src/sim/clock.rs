use std::time::Duration;

use serde::Serialize;

pub const MIN_SPEED: u8 = 1;
pub const MAX_SPEED: u8 = 10;

const BASE_TICK_MS: u64 = 5000;
const MIN_TICK_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationState {
    pub is_playing: bool,
    /// Multiplier, 1x to 10x
    pub speed: u8,
    /// Completed turns
    pub ticks: u64,
}

/// 5s at 1x down to 0.5s at 10x
pub fn tick_interval(speed: u8) -> Duration {
    let speed = u64::from(speed.clamp(MIN_SPEED, MAX_SPEED));
    Duration::from_millis((BASE_TICK_MS / speed).max(MIN_TICK_MS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 5000)]
    #[case(1, 5000)]
    #[case(2, 2500)]
    #[case(3, 1666)]
    #[case(10, 500)]
    #[case(42, 500)]
    fn test_tick_interval(#[case] speed: u8, #[case] millis: u64) {
        assert_eq!(tick_interval(speed), Duration::from_millis(millis));
    }
}
