use std::{
    future::Future,
    io::{self, Write},
    path::PathBuf,
};

use tokio_stream::Stream;

use crate::{
    batch::{self, Batch, BatchSummary},
    config::Config,
    engine::{MediaEngine, MissingTool, Toolchain, Transcoder},
    executor::Executor,
    output::{self, OutputError},
    progress::{ConsoleProgress, ProgressObserver},
};

/// Process exit status for a user interrupt (128 + SIGINT).
pub const EXIT_INTERRUPTED: u8 = 130;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Environment(#[from] MissingTool),
    #[error("{0}")]
    Filesystem(#[from] OutputError),
    #[error("no valid URLs were provided")]
    NoUrls,
    #[error("console I/O error: {0}")]
    Console(#[from] io::Error),
    #[error("interrupted by user")]
    Interrupted,
}

impl AppError {
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Interrupted => EXIT_INTERRUPTED,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sources {
    pub url: Option<String>,
    pub batch: Option<PathBuf>,
}

pub struct Capabilities {
    pub engine: Box<dyn MediaEngine>,
    pub transcoder: Box<dyn Transcoder>,
    pub observer: Box<dyn ProgressObserver>,
}

impl Capabilities {
    /// `yt-dlp` + `ffmpeg` from the environment, console progress bar.
    pub fn production(config: &Config) -> Result<Self, AppError> {
        let Toolchain { engine, transcoder } = Toolchain::locate(config)?;
        Ok(Self {
            engine: Box::new(engine),
            transcoder: Box::new(transcoder),
            observer: Box::new(ConsoleProgress),
        })
    }
}

/// Full run after the toolchain is known: prepare the output directory,
/// gather references (prompting when none were given), then download them.
///
/// `input` is only called when the prompt is needed. `interrupt` is called
/// once for the prompt, where it ends input normally, and once for the
/// downloads, where it aborts the batch.
pub async fn run<L, S, W, I, Fut>(
    config: &Config,
    sources: &Sources,
    capabilities: Capabilities,
    input: L,
    out: &mut W,
    interrupt: I,
) -> Result<BatchSummary, AppError>
where
    L: FnOnce() -> S,
    S: Stream<Item = io::Result<String>> + Unpin,
    W: Write,
    I: Fn() -> Fut,
    Fut: Future,
{
    let output_dir = output::prepare(&config.output_dir).await?;

    let gathered = batch::gather(sources.url.as_deref(), sources.batch.as_deref(), config).await;
    let mut urls = gathered.urls;
    if urls.is_empty() {
        urls = batch::prompt(input(), out, config, interrupt()).await?;
    }
    if urls.is_empty() {
        return Err(AppError::NoUrls);
    }

    let executor = Executor::new(
        config,
        &output_dir,
        capabilities.engine,
        capabilities.transcoder,
        capabilities.observer,
    );
    let batch = Batch::new(config, executor, &output_dir);

    tokio::select! {
        summary = batch.run(&urls) => Ok(summary),
        _ = interrupt() => Err(AppError::Interrupted),
    }
}
