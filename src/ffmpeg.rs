use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::{
    config::VERSION,
    engine::{TranscodeError, TranscodeRequest, Transcoder},
};

pub struct Ffmpeg {
    binary: PathBuf,
}

impl Ffmpeg {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    fn command(&self, request: &TranscodeRequest, output: &Path) -> Command {
        let mut child = Command::new(&self.binary);

        child
            .kill_on_drop(true)
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-i")
            .arg(&request.input);

        match &request.cover {
            Some(cover) => {
                child
                    .arg("-i")
                    .arg(cover)
                    .args(["-map", "0:a", "-map", "1:0"])
                    .args(["-c:v", "mjpeg", "-disposition:v", "attached_pic"])
                    .args(["-metadata:s:v", "title=Album cover"])
                    .args(["-metadata:s:v", "comment=Cover (front)"]);
            }
            None => {
                child.arg("-vn");
            }
        }

        child
            .args(["-c:a", "libmp3lame"])
            .arg("-b:a")
            .arg(format!("{}k", request.bitrate_kbps))
            .args(["-id3v2_version", "3"])
            .arg("-metadata")
            .arg("comment=Downloaded with tunedl")
            .arg("-metadata")
            .arg(format!("encoder=tunedl v{}", VERSION))
            .args(["-f", "mp3"])
            .arg(output);

        child
    }
}

/// Where the MP3 for `input` ends up.
pub fn mp3_path(input: &Path) -> PathBuf {
    input.with_extension("mp3")
}

#[async_trait]
impl Transcoder for Ffmpeg {
    async fn transcode(&self, request: &TranscodeRequest) -> Result<PathBuf, TranscodeError> {
        let output = mp3_path(&request.input);
        // The input may already be an .mp3, so never write over it directly.
        let temp = output.with_extension("mp3.part");

        debug!(
            "Transcoding {} -> {}",
            request.input.display(),
            output.display()
        );

        let result = self.command(request, &temp).output().await?;
        if !result.status.success() {
            let _ = tokio::fs::remove_file(&temp).await;
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(TranscodeError::Failed(match stderr.trim() {
                "" => format!("exited with {}", result.status),
                msg => msg.to_string(),
            }));
        }

        tokio::fs::rename(&temp, &output).await?;

        Ok(output)
    }
}
