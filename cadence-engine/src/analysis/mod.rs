//! Code analysis
//!
//! Turns a source snippet into a validated [`CodeSignal`]. Failures never
//! escape this module: [`CodeAnalyzer`] substitutes the per-language default
//! signal and reports that it did so.

pub mod client;
pub mod fallback;
pub mod parse;

pub use client::HttpAnalysisClient;
pub use fallback::fallback_signal;

use async_trait::async_trait;
use cadence_common::CodeSignal;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Analysis service errors
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("No analysis API key configured")]
    MissingApiKey,

    #[error("Reply contained no JSON object")]
    NoJson,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Reply contained no choices")]
    EmptyResponse,
}

/// Remote code-analysis service
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, source: &str, language: &str) -> Result<CodeSignal, AnalysisError>;
}

/// Signal plus whether it came from the fallback table
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub signal: CodeSignal,
    pub fallback: bool,
}

/// Failure-absorbing front of the analysis service
#[derive(Clone)]
pub struct CodeAnalyzer {
    service: Option<Arc<dyn AnalysisService>>,
}

impl CodeAnalyzer {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self {
            service: Some(service),
        }
    }

    /// Analyzer that always answers with language defaults
    pub fn offline() -> Self {
        Self { service: None }
    }

    pub async fn analyze(&self, source: &str, language: &str) -> Analysis {
        let Some(service) = &self.service else {
            debug!(language = %language, "No analysis service; using language default");
            return Analysis {
                signal: fallback_signal(language),
                fallback: true,
            };
        };

        match service.analyze(source, language).await {
            Ok(signal) => Analysis {
                signal,
                fallback: false,
            },
            Err(e) => {
                warn!(language = %language, "Code analysis failed, using language default: {}", e);
                Analysis {
                    signal: fallback_signal(language),
                    fallback: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_common::Complexity;

    struct FailingService;

    #[async_trait]
    impl AnalysisService for FailingService {
        async fn analyze(&self, _source: &str, _language: &str) -> Result<CodeSignal, AnalysisError> {
            Err(AnalysisError::Network("connection refused".to_string()))
        }
    }

    struct FixedService(CodeSignal);

    #[async_trait]
    impl AnalysisService for FixedService {
        async fn analyze(&self, _source: &str, _language: &str) -> Result<CodeSignal, AnalysisError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_language_default() {
        let analyzer = CodeAnalyzer::new(Arc::new(FailingService));
        let analysis = analyzer.analyze("fn main() {}", "rust").await;
        assert!(analysis.fallback);
        assert_eq!(analysis.signal, fallback_signal("rust"));
    }

    #[tokio::test]
    async fn test_success_passes_signal_through() {
        let mut signal = fallback_signal("python");
        signal.complexity = Complexity::VeryComplex;
        let analyzer = CodeAnalyzer::new(Arc::new(FixedService(signal.clone())));

        let analysis = analyzer.analyze("x = 1", "python").await;
        assert!(!analysis.fallback);
        assert_eq!(analysis.signal, signal);
    }

    #[tokio::test]
    async fn test_offline_analyzer() {
        let analysis = CodeAnalyzer::offline().analyze("", "go").await;
        assert!(analysis.fallback);
    }
}
