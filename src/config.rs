use std::{path::PathBuf, time::Duration};

use directories::{BaseDirs, UserDirs};

/// Hosts we hand to the engine. Matched as substrings of the URL host, so
/// `m.youtube.com` and `music.youtube.com` are accepted through `youtube.com`.
pub const SUPPORTED_DOMAINS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "soundcloud.com",
    "bandcamp.com",
    "vimeo.com",
    "dailymotion.com",
    "tiktok.com",
];

/// Words that end the interactive prompt, compared case-insensitively.
pub const EXIT_WORDS: &[&str] = &["exit", "quit", "salir", "listo", "ok"];

pub const MAX_ATTEMPTS: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(3);
pub const MP3_BITRATE_KBPS: u32 = 320;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaMode {
    /// Best audio stream, transcoded to MP3
    Audio,
    /// Best audio+video, kept in the container the engine picks
    Video,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub allowed_domains: Vec<String>,
    pub exit_words: Vec<String>,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub output_dir: PathBuf,
    pub mode: MediaMode,
    pub bitrate_kbps: u32,
    pub write_thumbnail: bool,
    pub ytdlp_bin: PathBuf,
    pub ffmpeg_bin: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allowed_domains: SUPPORTED_DOMAINS.iter().map(|d| d.to_string()).collect(),
            exit_words: EXIT_WORDS.iter().map(|w| w.to_string()).collect(),
            max_attempts: MAX_ATTEMPTS,
            retry_delay: RETRY_DELAY,
            output_dir: default_output_dir(),
            mode: MediaMode::Audio,
            bitrate_kbps: MP3_BITRATE_KBPS,
            write_thumbnail: true,
            ytdlp_bin: PathBuf::from("yt-dlp"),
            ffmpeg_bin: PathBuf::from("ffmpeg"),
        }
    }
}

impl Config {
    pub fn is_exit_word(&self, input: &str) -> bool {
        let input = input.to_lowercase();
        self.exit_words.iter().any(|w| *w == input)
    }
}

/// `<audio dir>/tunedl`, falling back to `$HOME/Music/tunedl` when the
/// platform has no audio directory configured.
pub fn default_output_dir() -> PathBuf {
    let music = UserDirs::new()
        .and_then(|dirs| dirs.audio_dir().map(|p| p.to_path_buf()))
        .or_else(|| BaseDirs::new().map(|dirs| dirs.home_dir().join("Music")))
        .unwrap_or_else(|| PathBuf::from("Music"));

    music.join("tunedl")
}
