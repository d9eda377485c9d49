use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;
use tracing::info;

use tabscribe::{
    create_router, write_document, AppState, AudioExporter, CaptureConfig, CaptureSession,
    CaptureSource, Config, DocumentFormat, RecognizeConfig, RefreshTokenProvider,
    RemoteRecognizer, RemoteStreamBackend, TokenProvider, TranscriptionConfig,
    TranscriptionSession,
};

#[derive(Parser)]
#[command(name = "tabscribe", about = "Audio capture and transcription with a speech-token relay")]
struct Cli {
    /// Config file name (config crate convention, extension omitted)
    #[arg(long, default_value = "config/tabscribe")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the token relay HTTP server
    Serve,

    /// Transcribe a WAV file through the remote speech API
    Transcribe {
        /// Audio file to transcribe
        file: PathBuf,

        /// Write the transcript as a document to this path
        #[arg(long)]
        document: Option<PathBuf>,

        /// Document format
        #[arg(long, value_enum, default_value = "pdf")]
        format: DocumentFormatArg,
    },

    /// Record from the microphone and transcribe live until Ctrl-C
    Listen {
        /// Write the transcript as a document to this path
        #[arg(long)]
        document: Option<PathBuf>,

        /// Document format
        #[arg(long, value_enum, default_value = "pdf")]
        format: DocumentFormatArg,

        /// Directory for the recorded audio download
        #[arg(long)]
        audio_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DocumentFormatArg {
    Pdf,
    Docx,
}

impl From<DocumentFormatArg> for DocumentFormat {
    fn from(arg: DocumentFormatArg) -> Self {
        match arg {
            DocumentFormatArg::Pdf => DocumentFormat::Pdf,
            DocumentFormatArg::Docx => DocumentFormat::Docx,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Transcribe {
            file,
            document,
            format,
        } => transcribe(cfg, file, document, format.into()).await,
        Command::Listen {
            document,
            format,
            audio_dir,
        } => listen(cfg, document, format.into(), audio_dir).await,
    }
}

async fn serve(cfg: Config) -> Result<()> {
    let tokens: Arc<dyn TokenProvider> = Arc::new(RefreshTokenProvider::new(&cfg.credentials.path));
    let router = create_router(AppState::new(tokens));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("{} listening on {}", cfg.service.name, addr);

    axum::serve(listener, router).await?;

    Ok(())
}

async fn transcribe(
    cfg: Config,
    file: PathBuf,
    document: Option<PathBuf>,
    format: DocumentFormat,
) -> Result<()> {
    let tokens: Arc<dyn TokenProvider> = Arc::new(RefreshTokenProvider::new(&cfg.credentials.path));
    let recognizer = RemoteRecognizer::new(
        cfg.speech.endpoint.clone(),
        tokens,
        RecognizeConfig {
            encoding: cfg.speech.encoding.clone(),
            sample_rate_hertz: cfg.speech.sample_rate_hertz,
        },
    )?;

    let mut capture = CaptureSession::new(capture_config(&cfg));
    let handle = capture.start(CaptureSource::File(file)).await?;

    // The file source closes its channel at end-of-file.
    while !capture.is_drained() {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    let blob = capture.stop(handle).await?;

    let transcripts = recognizer
        .recognize(&blob.data, &cfg.speech.language_code)
        .await?;
    let transcript = transcripts.join("\n");

    println!("{transcript}");

    if let Some(path) = document {
        let written = write_document(&transcript, format, &path)?;
        info!("Transcript document written to {}", written.display());
    }

    Ok(())
}

async fn listen(
    cfg: Config,
    document: Option<PathBuf>,
    format: DocumentFormat,
    audio_dir: Option<PathBuf>,
) -> Result<()> {
    let tokens: Arc<dyn TokenProvider> = Arc::new(RefreshTokenProvider::new(&cfg.credentials.path));
    let recognizer = Arc::new(RemoteRecognizer::new(
        cfg.speech.endpoint.clone(),
        tokens,
        RecognizeConfig {
            encoding: cfg.speech.encoding.clone(),
            sample_rate_hertz: cfg.speech.sample_rate_hertz,
        },
    )?);

    let (chunk_tx, chunk_rx) = mpsc::channel(64);

    let mut capture = CaptureSession::new(capture_config(&cfg));
    capture.route_chunks_to(chunk_tx);

    let mut transcription = TranscriptionSession::new(TranscriptionConfig {
        language_code: cfg.speech.language_code.clone(),
        interim_results: cfg.transcript.interim_results,
        continuous: cfg.transcript.continuous,
        policy: cfg.transcript.policy,
    });

    let backend = RemoteStreamBackend::new(recognizer, chunk_rx);
    let transcription_handle = transcription.start(Box::new(backend)).await?;
    let capture_handle = capture.start(CaptureSource::Microphone).await?;

    info!("Recording from microphone; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;

    let blob = capture.stop(capture_handle).await?;
    let transcript = transcription.stop(transcription_handle).await?;

    println!("{transcript}");

    if let Some(path) = document {
        let written = write_document(&transcript, format, &path)?;
        info!("Transcript document written to {}", written.display());
    }

    if let Some(dir) = audio_dir {
        let mut exporter = AudioExporter::new(dir)?;
        let download = exporter.export(&blob, "recording")?;
        info!("Recording download at {}", download.path.display());
    }

    Ok(())
}

fn capture_config(cfg: &Config) -> CaptureConfig {
    CaptureConfig {
        target_sample_rate: cfg.capture.sample_rate,
        target_channels: cfg.capture.channels,
        buffer_duration_ms: cfg.capture.buffer_ms,
    }
}
