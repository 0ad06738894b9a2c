use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{Config, MediaMode};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// MP3 transcoded from the best audio stream
    Audio,
    /// Best available audio+video
    Video,
}

impl From<Format> for MediaMode {
    fn from(f: Format) -> Self {
        match f {
            Format::Audio => MediaMode::Audio,
            Format::Video => MediaMode::Video,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Download audio from YouTube and other sites as MP3.
#[derive(Debug, Parser)]
#[command(name = "tunedl", version, about)]
pub struct Cli {
    /// URL of the content to download
    pub url: Option<String>,

    /// Output directory [default: <music dir>/tunedl]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// File with a list of URLs, one per line
    #[arg(short, long, value_name = "FILE")]
    pub batch: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Format::Audio)]
    pub format: Format,

    /// yt-dlp binary to use
    #[arg(long = "yt-dlp", env = "TUNEDL_YT_DLP", default_value = "yt-dlp")]
    pub ytdlp: PathBuf,

    /// ffmpeg binary to use
    #[arg(long, env = "TUNEDL_FFMPEG", default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,
}

impl Cli {
    pub fn to_config(&self) -> Config {
        let defaults = Config::default();
        Config {
            output_dir: self.output.clone().unwrap_or(defaults.output_dir.clone()),
            mode: self.format.into(),
            ytdlp_bin: self.ytdlp.clone(),
            ffmpeg_bin: self.ffmpeg.clone(),
            ..defaults
        }
    }
}
