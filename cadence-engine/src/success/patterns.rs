//! Success pattern library
//!
//! Built once, on first use. Substring matchers compare case-insensitively;
//! regex matchers carry their own flags.

use cadence_common::CelebrationType;
use once_cell::sync::Lazy;
use regex::Regex;

/// Weight applied to secondary patterns
pub const SECONDARY_WEIGHT: f64 = 0.85;

#[derive(Debug, Clone)]
pub enum Matcher {
    /// Lowercase needle
    Substring(&'static str),
    Regex(Regex),
}

impl Matcher {
    pub fn is_match(&self, text: &str, lowered: &str) -> bool {
        match self {
            Matcher::Substring(needle) => lowered.contains(needle),
            Matcher::Regex(re) => re.is_match(text),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuccessPattern {
    pub matcher: Matcher,
    pub celebration_type: CelebrationType,
    /// Declared confidence in (0, 1]
    pub confidence: f64,
    /// Corroborating signal that scores below its declared confidence
    pub secondary: bool,
    /// Text that cancels an otherwise matching pattern
    pub unless: Option<Regex>,
    pub description: &'static str,
}

impl SuccessPattern {
    /// Declared confidence on a match (reduced for secondary patterns), else 0
    pub fn score(&self, text: &str, lowered: &str) -> f64 {
        if !self.matcher.is_match(text, lowered) {
            return 0.0;
        }
        if self.unless.as_ref().is_some_and(|re| re.is_match(text)) {
            return 0.0;
        }
        if self.secondary {
            self.confidence * SECONDARY_WEIGHT
        } else {
            self.confidence
        }
    }
}

fn substring(
    needle: &'static str,
    celebration_type: CelebrationType,
    confidence: f64,
    description: &'static str,
) -> SuccessPattern {
    SuccessPattern {
        matcher: Matcher::Substring(needle),
        celebration_type,
        confidence,
        secondary: false,
        unless: None,
        description,
    }
}

fn regex(
    pattern: &str,
    celebration_type: CelebrationType,
    confidence: f64,
    description: &'static str,
) -> SuccessPattern {
    SuccessPattern {
        // Patterns are literals in this file and covered by tests
        matcher: Matcher::Regex(Regex::new(pattern).expect("invalid success pattern")),
        celebration_type,
        confidence,
        secondary: false,
        unless: None,
        description,
    }
}

fn secondary(mut pattern: SuccessPattern) -> SuccessPattern {
    pattern.secondary = true;
    pattern
}

fn unless(mut pattern: SuccessPattern, veto: &str) -> SuccessPattern {
    pattern.unless = Some(Regex::new(veto).expect("invalid success veto pattern"));
    pattern
}

static PATTERNS: Lazy<Vec<SuccessPattern>> = Lazy::new(build_patterns);

/// The static pattern table
pub fn success_patterns() -> &'static [SuccessPattern] {
    &PATTERNS
}

fn build_patterns() -> Vec<SuccessPattern> {
    use CelebrationType::*;

    vec![
        // Compilation
        substring("compiled successfully", CompilationSuccess, 0.95, "Compiler reported success"),
        substring("build succeeded", CompilationSuccess, 0.95, "Build succeeded"),
        regex(r"(?i)build (completed|finished) successfully", CompilationSuccess, 0.9, "Build completed"),
        regex(r"(?i)\bfinished\b.*\b(dev|release|test)\b.*target", CompilationSuccess, 0.9, "Cargo build finished"),
        substring("webpack compiled", CompilationSuccess, 0.9, "Webpack bundle compiled"),
        substring("compilation finished", CompilationSuccess, 0.85, "Compilation finished"),
        regex(r"(?i)build output created: .*(dist|build|out|target)", CompilationSuccess, 0.8, "Build artifacts written"),
        secondary(regex(r"(?i)\b0 errors?\b", CompilationSuccess, 0.6, "Zero errors reported")),
        // Tests
        regex(r"(?i)all tests passed", TestPass, 0.95, "All tests passed"),
        regex(r"(?i)test result: ok\.", TestPass, 0.95, "Cargo test suite passed"),
        regex(r"(?i)tests?:\s+\d+ passed", TestPass, 0.9, "Jest suite passed"),
        unless(
            regex(r"(?i)\b\d+ passing\b", TestPass, 0.9, "Mocha suite passed"),
            r"(?i)\b[1-9]\d* failing\b",
        ),
        regex(r"(?i)=+ \d+ passed", TestPass, 0.9, "Pytest suite passed"),
        secondary(regex(r"(?i)\b0 failed\b", TestPass, 0.7, "Zero test failures")),
        // Bug fixes
        substring("all errors resolved", BugFix, 0.95, "All errors resolved"),
        regex(r"(?i)errors? (fixed|resolved)", BugFix, 0.85, "Errors fixed"),
        secondary(regex(r"(?i)errors reduced from \d+ to \d+", BugFix, 0.75, "Error count reduced")),
        substring("no problems", BugFix, 0.7, "No problems detected"),
        // Deployment
        substring("deployed successfully", Deployment, 0.95, "Deployment succeeded"),
        regex(r"(?i)deploy(ment)? (complete|completed|succeeded|successful)", Deployment, 0.9, "Deployment completed"),
        regex(r"(?i)\bdigest: sha256:[0-9a-f]+", Deployment, 0.85, "Image pushed"),
        regex(r"(?i)pushed .*to .*registry", Deployment, 0.8, "Pushed to registry"),
        secondary(substring("published", Deployment, 0.7, "Package published")),
    ]
}
