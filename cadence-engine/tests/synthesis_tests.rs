//! End-to-end synthesis scenarios

use cadence_common::{CodeSignal, CodeType, Complexity, Mood};
use cadence_engine::synthesis::diagnostics::{assess, DiagnosticSynthesizer};
use cadence_engine::synthesis::profiles::{
    Severity, ESCALATING_INSTRUMENTS, MAXIMUM_STRESS_INSTRUMENTS, TENSION_INSTRUMENTS,
};
use cadence_engine::synthesis::prompt::{render_prompt, with_prompt, StressLevel};
use cadence_engine::synthesis::{size_class, ParameterSynthesizer};
use std::collections::BTreeSet;

fn signal(complexity: Complexity, recommended_bpm: Option<u32>) -> CodeSignal {
    CodeSignal {
        complexity,
        mood: Mood::Focused,
        patterns: BTreeSet::new(),
        code_type: CodeType::Algorithm,
        recommended_bpm,
        energy: None,
        genre: "ambient".to_string(),
        description: "test snippet".to_string(),
    }
}

fn has_any(instruments: &[String], set: &[&str]) -> bool {
    instruments.iter().any(|i| set.contains(&i.as_str()))
}

#[test]
fn test_simple_python_snippet() {
    let mut synthesizer = ParameterSynthesizer::with_seed(7);
    let request = synthesizer.synthesize(&signal(Complexity::Simple, Some(70)), "python", 10);

    assert_eq!(request.bpm, 55);
    assert_eq!(request.duration, 25);
    assert_eq!(request.genre, "algorithmic ambient");
    assert!(!has_any(&request.instruments, &TENSION_INSTRUMENTS));
    assert!(!has_any(&request.instruments, &ESCALATING_INSTRUMENTS));
    assert!(!has_any(&request.instruments, &MAXIMUM_STRESS_INSTRUMENTS));
    assert!(request.has_tag("10_lines"));
    assert!(request.has_tag("manageable"));
}

#[test]
fn test_simple_draw_minus_size_adjustment() {
    // Without a hint the tier draw lands in [60, 80]; the <25 bucket subtracts 15
    for seed in 0..50 {
        let mut synthesizer = ParameterSynthesizer::with_seed(seed);
        let request = synthesizer.synthesize(&signal(Complexity::Simple, None), "python", 10);
        assert!((45..=65).contains(&request.bpm), "seed {} gave {}", seed, request.bpm);
    }
}

#[test]
fn test_very_complex_large_python_file() {
    let mut synthesizer = ParameterSynthesizer::with_seed(3);
    let request = synthesizer.synthesize(&signal(Complexity::VeryComplex, None), "python", 400);

    assert_eq!(request.duration, 120);
    assert!(request.genre.starts_with("overwhelming "), "genre was {}", request.genre);
    assert!(has_any(&request.instruments, &MAXIMUM_STRESS_INSTRUMENTS));
    assert!(request.prompt.contains(StressLevel::High.clause()));
    assert!(request.has_tag("high_stress"));
}

#[test]
fn test_outputs_stay_in_bounds_for_every_tier_and_size() {
    let mut synthesizer = ParameterSynthesizer::with_seed(11);
    for complexity in Complexity::ALL {
        for hint in [None, Some(60), Some(140)] {
            for language in ["python", "rust", "markdown", "cobol"] {
                for lines in (0..10_000).step_by(37).chain([24, 25, 499, 500, 9_999]) {
                    let request = synthesizer.synthesize(&signal(complexity, hint), language, lines);
                    assert!((40..=200).contains(&request.bpm), "bpm {}", request.bpm);
                    assert!(
                        (1.0..=10.0).contains(&request.energy),
                        "energy {} for {:?}/{}/{}",
                        request.energy,
                        complexity,
                        language,
                        lines
                    );
                    assert!(!request.prompt.is_empty());
                }
            }
        }
    }
}

#[test]
fn test_size_class_is_monotonic() {
    let mut previous = size_class(0);
    for lines in 1..1_000 {
        let current = size_class(lines);
        assert!(current.bpm_adjustment >= previous.bpm_adjustment);
        assert!(current.energy_adjustment >= previous.energy_adjustment);
        assert!(current.duration_seconds >= previous.duration_seconds);
        assert!(current.stress_multiplier >= previous.stress_multiplier);
        previous = current;
    }
}

#[test]
fn test_prompt_rendering_is_idempotent() {
    let mut synthesizer = ParameterSynthesizer::with_seed(5);
    let request = synthesizer.synthesize(&signal(Complexity::Complex, None), "go", 180);

    let again = with_prompt(&request);
    assert_eq!(again, request);
    assert_eq!(render_prompt(&again), request.prompt);
}

#[test]
fn test_diagnostics_not_improving_high() {
    let assessment = assess(12, 3, Some(12));
    assert!(!assessment.is_improving);
    assert_eq!(assessment.total_issues, 13.5);
    assert_eq!(assessment.severity, Some(Severity::High));

    let request = DiagnosticSynthesizer::new().synthesize(12, 3, Some(12));
    assert_eq!(request.context, "diagnostic feedback: high");
    assert!(request.has_tag("high_stress"));
    assert!(request.has_tag("12_errors"));
    assert!(request.has_tag("3_warnings"));
}

#[test]
fn test_diagnostics_improving_uses_hopeful_profile() {
    let request = DiagnosticSynthesizer::new().synthesize(3, 10, Some(8));
    assert_eq!(request.mood, "hopeful");
    assert!(!request.has_tag("high_stress"));
}
