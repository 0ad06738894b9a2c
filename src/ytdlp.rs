use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
};
use tokio_stream::{wrappers::SplitStream, StreamExt};

use crate::{
    config::MediaMode,
    engine::{EngineError, FetchOptions, Fetched, MediaEngine, MediaFile},
    progress::{ProgressEvent, ProgressObserver},
    validate::SourceRef,
};

const PROGRESS_TAG: &str = "tunedl:progress ";
const FILE_TAG: &str = "tunedl:file ";
const PLAYLIST_TAG: &str = "tunedl:playlist ";

/// Drives the `yt-dlp` binary. Everything we need back from it is requested
/// as tagged JSON lines so the human-oriented output can be ignored.
pub struct YtDlp {
    binary: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RawProgress {
    downloaded_bytes: Option<f64>,
    total_bytes: Option<f64>,
    total_bytes_estimate: Option<f64>,
    speed: Option<f64>,
    eta: Option<f64>,
}

impl From<RawProgress> for ProgressEvent {
    fn from(raw: RawProgress) -> Self {
        let total = raw.total_bytes.or(raw.total_bytes_estimate);
        let percent = match (raw.downloaded_bytes, total) {
            (Some(done), Some(total)) if total > 0.0 => Some(done / total * 100.0),
            _ => None,
        };

        ProgressEvent {
            percent,
            speed: raw.speed,
            eta: raw.eta.map(|s| s.max(0.0).round() as u64),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PrintedFile {
    filepath: PathBuf,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PrintedPlaylist {
    title: Option<String>,
    id: Option<String>,
}

#[derive(Debug)]
enum EngineLine {
    Progress(ProgressEvent),
    File { path: PathBuf, title: String },
    Playlist(String),
    Error(String),
}

fn parse_line(line: &str) -> Option<EngineLine> {
    let line = line.trim();

    if let Some(json) = line.strip_prefix(PROGRESS_TAG) {
        let raw: RawProgress = serde_json::from_str(json).ok()?;
        return Some(EngineLine::Progress(raw.into()));
    }
    if let Some(json) = line.strip_prefix(FILE_TAG) {
        let file: PrintedFile = serde_json::from_str(json).ok()?;
        let title = file.title.unwrap_or_else(|| {
            file.filepath
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        return Some(EngineLine::File {
            path: file.filepath,
            title,
        });
    }
    if let Some(json) = line.strip_prefix(PLAYLIST_TAG) {
        let playlist: PrintedPlaylist = serde_json::from_str(json).ok()?;
        return Some(EngineLine::Playlist(
            playlist
                .title
                .or(playlist.id)
                .unwrap_or_else(|| "playlist".to_string()),
        ));
    }
    if let Some(msg) = line.strip_prefix("ERROR:") {
        return Some(EngineLine::Error(msg.trim().to_string()));
    }

    None
}

impl YtDlp {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    fn args(&self, url: &SourceRef, options: &FetchOptions) -> Vec<OsString> {
        let format = match options.mode {
            MediaMode::Audio => "bestaudio/best",
            MediaMode::Video => "bestvideo*+bestaudio/best",
        };
        let template = options.output_dir.join("%(title)s.%(ext)s");

        let mut args: Vec<OsString> = vec![
            "--newline".into(),
            "--encoding".into(),
            "utf-8".into(),
            "--no-simulate".into(),
            "--progress".into(),
            "--format".into(),
            format.into(),
            "--output".into(),
            template.into_os_string(),
            "--retries".into(),
            "10".into(),
            "--fragment-retries".into(),
            "10".into(),
            "--skip-unavailable-fragments".into(),
            "--concurrent-fragments".into(),
            "5".into(),
            "--no-write-description".into(),
            "--no-write-info-json".into(),
            "--no-write-subs".into(),
            "--progress-template".into(),
            format!(
                "download:{}%(progress.{{downloaded_bytes,total_bytes,total_bytes_estimate,speed,eta}})j",
                PROGRESS_TAG
            )
            .into(),
            "--print".into(),
            format!("after_move:{}%(.{{filepath,title}})j", FILE_TAG).into(),
            "--print".into(),
            format!("playlist:{}%(.{{title,id}})j", PLAYLIST_TAG).into(),
        ];

        if options.write_thumbnail {
            args.push("--write-thumbnail".into());
            args.push("--convert-thumbnails".into());
            args.push("jpg".into());
        }

        args.push("--".into());
        args.push(url.as_str().into());
        args
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

fn thumbnail_for(path: &Path) -> Option<PathBuf> {
    let thumb = path.with_extension("jpg");
    thumb.is_file().then_some(thumb)
}

#[derive(Clone, Copy)]
enum Pipe {
    Stdout,
    Stderr,
}

#[async_trait]
impl MediaEngine for YtDlp {
    async fn fetch(
        &self,
        url: &SourceRef,
        options: &FetchOptions,
        observer: &dyn ProgressObserver,
    ) -> Result<Fetched, EngineError> {
        let mut child = Command::new(&self.binary)
            .args(self.args(url, options))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take().ok_or_else(|| {
            EngineError::Io(std::io::Error::other("yt-dlp stdout not captured"))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            EngineError::Io(std::io::Error::other("yt-dlp stderr not captured"))
        })?;

        // Split on raw bytes: a console in a legacy code page can emit
        // titles that are not UTF-8.
        let out_lines =
            SplitStream::new(BufReader::new(stdout).split(b'\n')).map(|l| (Pipe::Stdout, l));
        let err_lines =
            SplitStream::new(BufReader::new(stderr).split(b'\n')).map(|l| (Pipe::Stderr, l));
        let mut lines = out_lines.merge(err_lines);

        let mut fetched = Fetched::default();
        let mut errors = Vec::new();
        let mut transferring = false;

        while let Some((pipe, line)) = lines.next().await {
            let line = decode_line(&line?);
            match parse_line(&line) {
                Some(EngineLine::Progress(event)) => {
                    transferring = true;
                    observer.on_progress(&event);
                }
                Some(EngineLine::File { path, title }) => {
                    if transferring {
                        observer.on_finished();
                        transferring = false;
                    }
                    let thumbnail = if options.write_thumbnail {
                        thumbnail_for(&path)
                    } else {
                        None
                    };
                    fetched.files.push(MediaFile {
                        title,
                        path,
                        thumbnail,
                    });
                }
                Some(EngineLine::Playlist(title)) => fetched.playlist = Some(title),
                Some(EngineLine::Error(msg)) => {
                    warn!("yt-dlp: {}", msg);
                    errors.push(msg);
                }
                None => match pipe {
                    Pipe::Stdout => trace!("yt-dlp: {}", line),
                    Pipe::Stderr => debug!("yt-dlp stderr: {}", line),
                },
            }
        }

        if transferring {
            observer.on_finished();
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(EngineError::Download(if errors.is_empty() {
                format!("yt-dlp exited with {}", status)
            } else {
                errors.join("; ")
            }));
        }

        Ok(fetched)
    }
}
