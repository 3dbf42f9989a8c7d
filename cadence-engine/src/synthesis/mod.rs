//! Parameter synthesis pipeline
//!
//! Turns a coarse `CodeSignal` into a fully specified `MusicRequest` in three
//! stages, each returning a new value:
//!
//! 1. **Base parameters** from the complexity tier table (the only random step)
//! 2. **Contextual modification** by language override and line-count stress
//! 3. **Prompt rendering** (see [`prompt`])
//!
//! The sibling [`diagnostics`] pipeline shares stage 3.

pub mod diagnostics;
pub mod profiles;
pub mod prompt;
pub mod size_class;

pub use diagnostics::DiagnosticSynthesizer;
pub use size_class::{size_class, SizeClass};

use cadence_common::{CelebrationType, CodeSignal, Complexity, MusicRequest};
use profiles::{
    celebration_profile, language_override, tier_profile, to_strings, ESCALATING_INSTRUMENTS,
    MAXIMUM_STRESS_INSTRUMENTS, TENSION_INSTRUMENTS,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Synthesized tempo bounds
pub const MIN_BPM: i64 = 40;
pub const MAX_BPM: i64 = 200;
/// Synthesized energy bounds
pub const MIN_ENERGY: f64 = 1.0;
pub const MAX_ENERGY: f64 = 10.0;

/// Line counts at which instrumentation escalates
const TENSION_LINES: usize = 50;
const ESCALATING_LINES: usize = 150;
const MAXIMUM_STRESS_LINES: usize = 300;

/// Code-signal → music request synthesizer
///
/// Owns its random source so tests can pin the tier draws with a seed.
pub struct ParameterSynthesizer {
    rng: StdRng,
}

impl Default for ParameterSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterSynthesizer {
    /// Synthesizer drawing from OS entropy
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic synthesizer for tests and reproducible runs
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Run all three stages
    pub fn synthesize(&mut self, signal: &CodeSignal, language_id: &str, line_count: usize) -> MusicRequest {
        let base = base_parameters(signal, &mut self.rng);
        debug!(
            bpm = base.bpm,
            energy = base.energy,
            genre = %base.genre,
            stress_factor = tier_profile(signal.complexity).stress_factor,
            "Stage 1 base parameters"
        );

        let contextual = contextual_parameters(&base, language_id, line_count);
        debug!(
            bpm = contextual.bpm,
            energy = contextual.energy,
            duration = contextual.duration,
            genre = %contextual.genre,
            instruments = contextual.instruments.len(),
            "Stage 2 contextual parameters"
        );

        prompt::with_prompt(&contextual)
    }
}

/// Stage 1: base parameters from the complexity tier
///
/// Valid tempo/energy hints on the signal win; otherwise a uniform draw from
/// the tier range is used.
pub fn base_parameters<R: Rng + ?Sized>(signal: &CodeSignal, rng: &mut R) -> MusicRequest {
    let tier = tier_profile(signal.complexity);

    let bpm = signal
        .recommended_bpm
        .unwrap_or_else(|| rng.gen_range(tier.bpm_range.clone()));
    let energy = signal
        .energy
        .unwrap_or_else(|| rng.gen_range(tier.energy_range.clone()));

    let mut tags = vec![
        signal.complexity.as_str().to_string(),
        signal.mood.as_str().to_string(),
        signal.code_type.as_str().to_string(),
        tier.tension.to_string(),
    ];
    tags.extend(signal.patterns.iter().cloned());

    MusicRequest {
        bpm,
        mood: signal.mood.as_str().to_string(),
        genre: tier.genre.to_string(),
        energy: energy as f64,
        complexity: signal.complexity.as_str().to_string(),
        instruments: to_strings(tier.instruments),
        structure: tier.structure.to_string(),
        duration: 0,
        tags,
        prompt: String::new(),
        context: format!("code:{}", signal.code_type.as_str()),
    }
}

/// Stage 2: language override, then line-count stress scaling and escalation
pub fn contextual_parameters(base: &MusicRequest, language_id: &str, line_count: usize) -> MusicRequest {
    let mut request = base.clone();

    if let Some(row) = language_override(language_id) {
        request.genre = row.genre.to_string();
        request.instruments = to_strings(row.instruments);
        request.tags = to_strings(row.tags);
        request.energy = clamp_energy(request.energy + row.energy_delta as f64);
    }
    if !language_id.is_empty() {
        request.context = format!("{}:{}", request.context, language_id.to_lowercase());
    }

    let size = size_class(line_count);
    request.bpm = (request.bpm as i64 + size.bpm_adjustment as i64).clamp(MIN_BPM, MAX_BPM) as u32;
    request.energy = round_one_decimal(clamp_energy(
        (request.energy + size.energy_adjustment as f64) * size.stress_multiplier,
    ));
    request.duration = size.duration_seconds;

    if line_count >= TENSION_LINES {
        request.instruments.extend(to_strings(&TENSION_INSTRUMENTS));
    }
    if line_count >= ESCALATING_LINES {
        request.instruments.extend(to_strings(&ESCALATING_INSTRUMENTS));
        request.genre = format!("high-tension {}", request.genre);
    }
    if line_count >= MAXIMUM_STRESS_LINES {
        request.instruments.extend(to_strings(&MAXIMUM_STRESS_INSTRUMENTS));
        request.genre = format!("overwhelming {}", request.genre);
    }

    request.tags.push(format!("{}_lines", line_count));
    request.tags.push(if size.is_high_stress() { "high_stress" } else { "manageable" }.to_string());

    request
}

/// Telemetry score in [1, 10], one decimal
///
/// Not fed back into the request.
pub fn complexity_score(complexity: Complexity, line_count: usize, energy: f64) -> f64 {
    let base = match complexity {
        Complexity::Simple => 3.0,
        Complexity::Moderate => 5.0,
        Complexity::Complex => 7.0,
        Complexity::VeryComplex => 10.0,
    };
    let score = base * size_class::score_size_multiplier(line_count) + energy * 0.2;
    round_one_decimal(score.clamp(MIN_ENERGY, MAX_ENERGY))
}

/// Music request for an accepted celebration
pub fn celebration_request(celebration: CelebrationType) -> MusicRequest {
    let profile = celebration_profile(celebration);
    let request = MusicRequest {
        bpm: profile.bpm,
        mood: profile.mood.to_string(),
        genre: profile.genre.to_string(),
        energy: profile.energy,
        complexity: profile.complexity.to_string(),
        instruments: to_strings(profile.instruments),
        structure: profile.structure.to_string(),
        duration: profile.duration,
        tags: vec!["celebration".to_string(), celebration.as_str().to_string()],
        prompt: String::new(),
        context: format!("celebration:{}", celebration.as_str()),
    };
    prompt::with_prompt(&request)
}

fn clamp_energy(energy: f64) -> f64 {
    energy.clamp(MIN_ENERGY, MAX_ENERGY)
}

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
