use std::{
    fmt,
    future::Future,
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, Local};
use tokio::time::Instant;
use tokio_stream::{Stream, StreamExt};

use crate::{
    config::Config,
    executor::{Delivered, Executor},
    retry::{self, RetryOutcome, RetryPolicy},
    util,
    validate::{SourceRef, ValidationError},
};

const RULE_WIDTH: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    pub input: String,
    pub reason: ValidationError,
}

#[derive(Debug, Default)]
pub struct Gathered {
    pub urls: Vec<SourceRef>,
    pub skipped: Vec<Skipped>,
}

impl Gathered {
    fn push(&mut self, input: &str, config: &Config) {
        match SourceRef::parse(input, config) {
            Ok(url) => self.urls.push(url),
            Err(reason) => {
                warn!("Skipping {}: {}", input, reason);
                self.skipped.push(Skipped {
                    input: input.to_string(),
                    reason,
                });
            }
        }
    }
}

/// Collects references from the positional argument and the batch file. Both
/// sources are merged, argument first. An unreadable batch file is reported
/// and contributes nothing.
pub async fn gather(url: Option<&str>, batch_file: Option<&Path>, config: &Config) -> Gathered {
    let mut gathered = Gathered::default();

    if let Some(url) = url {
        gathered.push(url, config);
    }

    if let Some(path) = batch_file {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                let before = gathered.urls.len();
                contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .for_each(|line| gathered.push(line, config));
                println!(
                    "Read {} URL(s) from {}",
                    gathered.urls.len() - before,
                    path.display()
                );
            }
            Err(e) => error!("Could not read batch file {}: {}", path.display(), e),
        }
    }

    gathered
}

/// Interactive loop over console `lines` (see [`crate::console`]). Ends
/// normally on an exit word, end of input, or when `interrupt` resolves.
pub async fn prompt<S, W, I>(
    mut lines: S,
    out: &mut W,
    config: &Config,
    interrupt: I,
) -> io::Result<Vec<SourceRef>>
where
    S: Stream<Item = io::Result<String>> + Unpin,
    W: Write,
    I: Future,
{
    let mut urls = Vec::new();
    tokio::pin!(interrupt);

    writeln!(out, "\nInteractive mode (type 'salir' to finish)")?;

    loop {
        write!(out, "\nEnter a URL or 'listo': ")?;
        out.flush()?;

        let line = tokio::select! {
            line = lines.next() => line,
            _ = &mut interrupt => {
                writeln!(out, "\nInput cancelled")?;
                break;
            }
        };

        let input = match line {
            Some(Ok(line)) => line,
            None => {
                writeln!(out, "\nEnd of input")?;
                break;
            }
            Some(Err(e)) => {
                error!("Could not read input: {}", e);
                break;
            }
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if config.is_exit_word(input) {
            break;
        }

        match SourceRef::parse(input, config) {
            Ok(url) => {
                writeln!(out, "URL added: {}", url)?;
                urls.push(url);
            }
            Err(e) => writeln!(out, "Invalid or unsupported URL ({}). Try again.", e)?,
        }
    }

    Ok(urls)
}

#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub started: DateTime<Local>,
    pub elapsed: Duration,
    pub output_dir: PathBuf,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(f, "{}", rule)?;
        writeln!(f, "Download summary:")?;
        writeln!(f, "  Total:      {}", self.total)?;
        writeln!(f, "  Succeeded:  {}", self.succeeded)?;
        writeln!(f, "  Failed:     {}", self.failed)?;
        writeln!(f, "  Started:    {}", self.started.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "  Duration:   {}", util::format_elapsed(self.elapsed))?;
        writeln!(f, "  Directory:  {}", self.output_dir.display())?;
        write!(f, "{}", rule)
    }
}

/// Processes references one at a time, each to completion including retries.
pub struct Batch<'a> {
    config: &'a Config,
    executor: Executor,
    output_dir: PathBuf,
}

impl<'a> Batch<'a> {
    pub fn new(config: &'a Config, executor: Executor, output_dir: &Path) -> Self {
        Self {
            config,
            executor,
            output_dir: output_dir.to_path_buf(),
        }
    }

    pub async fn run(&self, urls: &[SourceRef]) -> BatchSummary {
        let policy = RetryPolicy::from(self.config);
        let started = Local::now();
        let clock = Instant::now();
        let total = urls.len();
        let mut succeeded = 0;

        println!("\nStarting download of {} item(s)...", total);

        for (i, url) in urls.iter().enumerate() {
            println!("\n{}", "=".repeat(RULE_WIDTH));
            println!("Downloading item {}/{}: {}", i + 1, total, url);

            let outcome = retry::run(policy, |_| self.executor.attempt(url)).await;
            let attempts = outcome.attempts();
            match outcome {
                RetryOutcome::Succeeded { value, .. } => {
                    succeeded += 1;
                    report_delivered(&value);
                }
                RetryOutcome::Exhausted { last_error, .. } => {
                    error!("Giving up on {}: {}", url, last_error);
                    println!("Failed after {} attempt(s): {}", attempts, url);
                }
            }
        }

        let elapsed = clock.elapsed();

        BatchSummary {
            total,
            succeeded,
            failed: total - succeeded,
            started,
            elapsed,
            output_dir: self.output_dir.clone(),
        }
    }
}

fn report_delivered(delivered: &Delivered) {
    match delivered {
        Delivered::File { title, path } => println!(
            "Downloaded: {} ({})",
            title,
            path.file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_else(|| path.to_string_lossy())
        ),
        Delivered::Playlist { title, files } => {
            println!("Playlist downloaded: {} ({} file(s))", title, files.len())
        }
    }
}
