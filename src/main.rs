//! Practice tutor - terminal client for AI-graded practice assessments

use clap::Parser;
use practice_tutor::backend::{HttpBackend, JsonFileProvider};
use practice_tutor::config::TutorConfig;
use practice_tutor::model::AssessmentId;
use practice_tutor::runtime::{QuestionProvider, SessionRuntime};
use practice_tutor::state_machine::Event;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    name = "practice-tutor",
    version,
    about = "Work through a practice assessment with an AI tutor"
)]
struct Cli {
    /// Assessment to open
    #[arg(short, long)]
    assessment: i64,

    /// Backend root URL (overrides PRACTICE_TUTOR_BACKEND)
    #[arg(long)]
    backend: Option<String>,

    /// Read questions from a JSON file instead of the backend
    #[arg(long)]
    questions: Option<PathBuf>,

    /// Where to write the JSON log (the terminal is taken by the interface)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = TutorConfig::from_env()?;
    if let Some(url) = cli.backend {
        config = config.with_backend_url(url)?;
    }
    if let Some(path) = cli.questions {
        config.questions_file = Some(path);
    }
    if let Some(path) = cli.log_file {
        config.log_file = path;
    }

    // Initialize logging
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "practice_tutor=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    let assessment = AssessmentId(cli.assessment);
    let backend = HttpBackend::new(&config)?;
    tracing::info!(
        %assessment,
        backend = %config.backend_url,
        questions_file = ?config.questions_file,
        "Starting practice session"
    );

    match config.questions_file.clone() {
        Some(path) => run_session(assessment, JsonFileProvider::new(path), backend).await,
        None => run_session(assessment, backend.clone(), backend).await,
    }
}

async fn run_session<P>(
    assessment: AssessmentId,
    provider: P,
    backend: HttpBackend,
) -> Result<(), Box<dyn std::error::Error>>
where
    P: QuestionProvider + 'static,
{
    let runtime = SessionRuntime::new(assessment, provider, backend.clone(), backend);
    let handle = runtime.handle();
    let updates = handle.subscribe();
    let task = runtime.spawn();

    let result = practice_tutor::tui::run(handle.clone(), updates).await;

    // Closing the view cancels any open stream; a late grade is dropped
    let _ = handle.send(Event::Teardown).await;
    let _ = task.await;
    tracing::info!(%assessment, "Practice session ended");

    result.map_err(Into::into)
}
