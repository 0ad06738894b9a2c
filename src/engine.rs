//! Capabilities the download workflow delegates to: a media engine that knows
//! how to talk to hosting sites, and a transcoder that turns whatever stream it
//! produced into an MP3. Production bindings live in [`crate::ytdlp`] and
//! [`crate::ffmpeg`]; tests substitute their own.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{
    config::{Config, MediaMode},
    ffmpeg::Ffmpeg,
    progress::ProgressObserver,
    validate::SourceRef,
    ytdlp::YtDlp,
};

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub output_dir: PathBuf,
    pub mode: MediaMode,
    pub write_thumbnail: bool,
}

impl FetchOptions {
    pub fn new(config: &Config, output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            mode: config.mode,
            write_thumbnail: config.write_thumbnail,
        }
    }
}

/// A single media file written by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    pub title: String,
    pub path: PathBuf,
    pub thumbnail: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fetched {
    pub files: Vec<MediaFile>,
    /// Set when the reference pointed at a playlist rather than one item.
    pub playlist: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// The engine ran and reported a failure (unavailable content, network,
    /// unsupported site).
    #[error("{0}")]
    Download(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait MediaEngine: Send + Sync {
    async fn fetch(
        &self,
        url: &SourceRef,
        options: &FetchOptions,
        observer: &dyn ProgressObserver,
    ) -> Result<Fetched, EngineError>;
}

#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    pub cover: Option<PathBuf>,
    pub bitrate_kbps: u32,
}

#[derive(thiserror::Error, Debug)]
pub enum TranscodeError {
    #[error("transcoder failed: {0}")]
    Failed(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Writes an MP3 next to the input and returns its path. The input is
    /// left in place.
    async fn transcode(&self, request: &TranscodeRequest) -> Result<PathBuf, TranscodeError>;
}

#[derive(thiserror::Error, Debug)]
#[error("{tool} not found ({}): {source}", .path.display())]
pub struct MissingTool {
    pub tool: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: which::Error,
}

/// Resolved production capabilities.
pub struct Toolchain {
    pub engine: YtDlp,
    pub transcoder: Ffmpeg,
}

impl Toolchain {
    /// Finds both binaries on `PATH` (or at the configured location).
    pub fn locate(config: &Config) -> Result<Self, MissingTool> {
        let ytdlp = which::which(&config.ytdlp_bin).map_err(|source| MissingTool {
            tool: "yt-dlp",
            path: config.ytdlp_bin.clone(),
            source,
        })?;
        let ffmpeg = which::which(&config.ffmpeg_bin).map_err(|source| MissingTool {
            tool: "ffmpeg",
            path: config.ffmpeg_bin.clone(),
            source,
        })?;

        debug!("Using {} and {}", ytdlp.display(), ffmpeg.display());

        Ok(Self {
            engine: YtDlp::new(ytdlp),
            transcoder: Ffmpeg::new(ffmpeg),
        })
    }
}
