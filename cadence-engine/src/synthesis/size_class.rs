//! Line-count stress buckets
//!
//! Models cognitive load as file size grows. Seven contiguous buckets with
//! exclusive upper bounds partition `[0, ∞)`; every output is non-decreasing
//! as the line count grows.

/// Tempo/energy/duration adjustment for a line count
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeClass {
    pub bpm_adjustment: i32,
    pub energy_adjustment: i32,
    pub duration_seconds: u32,
    pub stress_multiplier: f64,
}

/// (exclusive upper bound, class); `None` is the open-ended last bucket
const SIZE_BUCKETS: [(Option<usize>, SizeClass); 7] = [
    (Some(25), SizeClass { bpm_adjustment: -15, energy_adjustment: -2, duration_seconds: 25, stress_multiplier: 0.8 }),
    (Some(50), SizeClass { bpm_adjustment: -10, energy_adjustment: -1, duration_seconds: 30, stress_multiplier: 0.9 }),
    (Some(100), SizeClass { bpm_adjustment: 0, energy_adjustment: 0, duration_seconds: 45, stress_multiplier: 1.0 }),
    (Some(150), SizeClass { bpm_adjustment: 10, energy_adjustment: 1, duration_seconds: 60, stress_multiplier: 1.1 }),
    (Some(300), SizeClass { bpm_adjustment: 20, energy_adjustment: 2, duration_seconds: 90, stress_multiplier: 1.3 }),
    (Some(500), SizeClass { bpm_adjustment: 30, energy_adjustment: 3, duration_seconds: 120, stress_multiplier: 1.5 }),
    (None, SizeClass { bpm_adjustment: 40, energy_adjustment: 3, duration_seconds: 150, stress_multiplier: 1.8 }),
];

/// Size multipliers for the telemetry complexity score; deliberately steeper
const SCORE_MULTIPLIERS: [(Option<usize>, f64); 6] = [
    (Some(25), 0.7),
    (Some(50), 1.0),
    (Some(100), 1.5),
    (Some(150), 2.0),
    (Some(300), 3.0),
    (None, 4.0),
];

/// Multiplier above which a request is tagged `high_stress`
pub const HIGH_STRESS_MULTIPLIER: f64 = 1.2;

/// Map a line count to its stress bucket
pub fn size_class(line_count: usize) -> SizeClass {
    SIZE_BUCKETS
        .iter()
        .find(|(upper, _)| upper.map_or(true, |upper| line_count < upper))
        .map(|(_, class)| *class)
        .unwrap_or(SIZE_BUCKETS[SIZE_BUCKETS.len() - 1].1)
}

/// Size multiplier used by the complexity score
pub fn score_size_multiplier(line_count: usize) -> f64 {
    SCORE_MULTIPLIERS
        .iter()
        .find(|(upper, _)| upper.map_or(true, |upper| line_count < upper))
        .map(|(_, multiplier)| *multiplier)
        .unwrap_or(SCORE_MULTIPLIERS[SCORE_MULTIPLIERS.len() - 1].1)
}

impl SizeClass {
    pub fn is_high_stress(&self) -> bool {
        self.stress_multiplier > HIGH_STRESS_MULTIPLIER
    }
}
