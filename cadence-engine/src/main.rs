//! Cadence - main entry point
//!
//! One-shot commands for inspecting the synthesis and classification steps,
//! `generate` for a single end-to-end run, and `serve` for driving a session
//! from an editor plugin over JSON lines on stdin.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use cadence_common::config::TomlConfig;
use cadence_common::events::EventBus;
use cadence_common::CelebrationType;
use cadence_engine::analysis::{CodeAnalyzer, HttpAnalysisClient};
use cadence_engine::generation::{GenerationLifecycle, HttpGenerationClient, PollConfig, PollOutcome};
use cadence_engine::playback::{Player, ProcessPlayer};
use cadence_engine::session::{EditorEvent, Session};
use cadence_engine::success::{SuccessClassifier, SuccessEvent, SuccessEventKind};
use cadence_engine::synthesis::diagnostics::DiagnosticSynthesizer;
use cadence_engine::synthesis::{celebration_request, complexity_score, ParameterSynthesizer};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for cadence
#[derive(Parser, Debug)]
#[command(name = "cadence")]
#[command(about = "Music generated from the code you are writing")]
#[command(version)]
struct Args {
    /// Configuration file (overrides CADENCE_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse a source file and print the resulting music request
    Analyze {
        file: PathBuf,
        /// Language identifier (inferred from the extension when omitted)
        #[arg(short, long)]
        language: Option<String>,
        /// Seed for the tier range draws
        #[arg(long)]
        seed: Option<u64>,
        /// Skip the remote analysis service and use the language default
        #[arg(long)]
        offline: bool,
    },
    /// Print the music request for a diagnostics snapshot
    Diagnostics {
        errors: u32,
        warnings: u32,
        /// Error count of the previous snapshot
        #[arg(long)]
        previous: Option<u32>,
    },
    /// Classify a piece of output text or a finished task
    Classify {
        /// Terminal text, or the task command when --task is given
        text: String,
        /// Treat TEXT as the command of this task
        #[arg(long)]
        task: Option<String>,
        #[arg(long)]
        exit_code: Option<i32>,
    },
    /// Analyse a file (or pick a celebration), generate and play the result
    Generate {
        #[arg(required_unless_present = "celebrate")]
        file: Option<PathBuf>,
        #[arg(short, long)]
        language: Option<String>,
        /// Generate a celebration track instead (compilation_success, bug_fix, test_pass, deployment)
        #[arg(long)]
        celebrate: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run a session fed by JSON-line editor events on stdin
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Command::Analyze {
            file,
            language,
            seed,
            offline,
        } => analyze(&config, &file, language, seed, offline).await,
        Command::Diagnostics {
            errors,
            warnings,
            previous,
        } => {
            let request = DiagnosticSynthesizer::new().synthesize(errors, warnings, previous);
            print_json(&request)
        }
        Command::Classify {
            text,
            task,
            exit_code,
        } => classify(&config, text, task, exit_code),
        Command::Generate {
            file,
            language,
            celebrate,
            seed,
        } => generate(&config, file, language, celebrate, seed).await,
        Command::Serve => serve(config).await,
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Editor-style language identifier for a file extension
fn language_for_path(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_lowercase();
    match extension.as_str() {
        "py" => "python",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "javascriptreact",
        "ts" => "typescript",
        "tsx" => "typescriptreact",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" => "cpp",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "md" => "markdown",
        _ => "plaintext",
    }
    .to_string()
}

fn build_analyzer(config: &TomlConfig, offline: bool) -> CodeAnalyzer {
    if offline {
        return CodeAnalyzer::offline();
    }
    match HttpAnalysisClient::new(&config.analysis) {
        Ok(client) => CodeAnalyzer::new(Arc::new(client)),
        Err(e) => {
            warn!("Analysis service unavailable, using language defaults: {}", e);
            CodeAnalyzer::offline()
        }
    }
}

fn build_synthesizer(seed: Option<u64>) -> ParameterSynthesizer {
    seed.map_or_else(ParameterSynthesizer::new, ParameterSynthesizer::with_seed)
}

async fn analyze(
    config: &TomlConfig,
    file: &Path,
    language: Option<String>,
    seed: Option<u64>,
    offline: bool,
) -> Result<()> {
    let source = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let language = language.unwrap_or_else(|| language_for_path(file));
    let line_count = source.lines().count();

    let analysis = build_analyzer(config, offline).analyze(&source, &language).await;
    let request = build_synthesizer(seed).synthesize(&analysis.signal, &language, line_count);
    let score = complexity_score(analysis.signal.complexity, line_count, request.energy);

    info!(
        language = %language,
        lines = line_count,
        complexity_score = score,
        fallback = analysis.fallback,
        "Analysis completed"
    );
    print_json(&serde_json::json!({
        "signal": analysis.signal,
        "fallback": analysis.fallback,
        "complexity_score": score,
        "request": request,
    }))
}

fn classify(config: &TomlConfig, text: String, task: Option<String>, exit_code: Option<i32>) -> Result<()> {
    let event = match task {
        Some(task_name) => SuccessEvent::new(SuccessEventKind::TaskSuccess {
            task_name,
            command: text,
            exit_code,
        }),
        None => SuccessEvent::terminal(text),
    };

    let mut classifier = SuccessClassifier::new(&config.celebration);
    match classifier.classify(&event) {
        Some(celebration) => print_json(&serde_json::json!({
            "celebration_type": celebration.celebration_type,
            "confidence": celebration.confidence,
            "description": celebration.description,
            "source": celebration.source,
            "request": celebration.request,
        })),
        None => {
            println!("no celebration");
            Ok(())
        }
    }
}

async fn generate(
    config: &TomlConfig,
    file: Option<PathBuf>,
    language: Option<String>,
    celebrate: Option<String>,
    seed: Option<u64>,
) -> Result<()> {
    let request = match (celebrate, file) {
        (Some(label), _) => {
            let celebration = CelebrationType::parse(&label)
                .ok_or_else(|| anyhow!("Unknown celebration type '{}'", label))?;
            celebration_request(celebration)
        }
        (None, Some(file)) => {
            let source = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let language = language.unwrap_or_else(|| language_for_path(&file));
            let analysis = build_analyzer(config, false).analyze(&source, &language).await;
            build_synthesizer(seed).synthesize(&analysis.signal, &language, source.lines().count())
        }
        (None, None) => return Err(anyhow!("Either FILE or --celebrate is required")),
    };

    let service = HttpGenerationClient::new(&config.generation)
        .context("Failed to create generation client")?;
    let player = Arc::new(ProcessPlayer::new(&config.playback));
    let mut lifecycle = GenerationLifecycle::new(
        Arc::new(service),
        player.clone(),
        EventBus::default(),
        PollConfig::from(&config.generation),
        config.generation.instrumental,
    );

    info!(prompt = %request.prompt, "Submitting");
    let job = lifecycle.submit(&request).await;
    if lifecycle.active_job_id().is_none() {
        return Err(anyhow!(
            "Submission failed: {}",
            job.metadata.error_message.unwrap_or_default()
        ));
    }

    let outcome = lifecycle.wait().await;
    if let Some(outcome) = &outcome {
        info!(job_id = %outcome.job_id(), "Generation finished");
    }

    match outcome {
        Some(PollOutcome::Completed { job }) => {
            println!("{}", job.audio_url.as_deref().unwrap_or("(no audio url)"));
            player.wait_idle().await.context("Player failed")?;
            Ok(())
        }
        Some(PollOutcome::Failed {
            error_type,
            error_message,
            ..
        }) => Err(anyhow!(
            "Generation failed ({}): {}",
            error_type.unwrap_or_else(|| "unknown".to_string()),
            error_message.unwrap_or_default()
        )),
        Some(PollOutcome::TimedOut {
            last_status, attempts, ..
        }) => Err(anyhow!(
            "Generation timed out after {} polls (last status: {})",
            attempts,
            last_status
        )),
        Some(PollOutcome::Cancelled { job_id }) => Err(anyhow!("Generation {} was cancelled", job_id)),
        None => Err(anyhow!("Poll task ended unexpectedly")),
    }
}

async fn serve(config: TomlConfig) -> Result<()> {
    let bus = EventBus::default();
    let service = HttpGenerationClient::new(&config.generation)
        .context("Failed to create generation client")?;
    let player: Arc<dyn Player> = Arc::new(ProcessPlayer::new(&config.playback));
    let lifecycle = GenerationLifecycle::new(
        Arc::new(service),
        Arc::clone(&player),
        bus.clone(),
        PollConfig::from(&config.generation),
        config.generation.instrumental,
    );
    let session = Session::new(
        &config,
        build_analyzer(&config, false),
        lifecycle,
        player,
        bus.clone(),
    );

    // Outcomes go back to the editor as JSON lines
    let mut outcomes = bus.subscribe();
    let printer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        loop {
            match outcomes.recv().await {
                Ok(event) => {
                    let Ok(line) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if stdout.write_all(format!("{}\n", line).as_bytes()).await.is_err() {
                        break;
                    }
                    let _ = stdout.flush().await;
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event printer lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let (tx, rx) = mpsc::channel(64);
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = tokio::select! {
                line = lines.next_line() => line,
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down");
                    Ok(None)
                }
            };
            match line {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match serde_json::from_str::<EditorEvent>(&line) {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Ignoring malformed event: {}", e),
                },
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
        let _ = tx.send(EditorEvent::Shutdown).await;
    });

    info!("Serving editor events on stdin");
    session.run(rx).await;

    reader.abort();
    printer.abort();
    Ok(())
}
