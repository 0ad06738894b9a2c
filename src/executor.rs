use std::path::{Path, PathBuf};

use crate::{
    config::{Config, MediaMode},
    engine::{
        EngineError, FetchOptions, Fetched, MediaEngine, MediaFile, TranscodeRequest, Transcoder,
    },
    progress::ProgressObserver,
    validate::SourceRef,
};

/// Why a single attempt did not produce output. Both kinds are retried the
/// same way; the split only shows up in the console message.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    #[error("download error: {0}")]
    Download(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<EngineError> for AttemptError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Download(msg) => AttemptError::Download(msg),
            other => AttemptError::Unexpected(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Delivered {
    File { title: String, path: PathBuf },
    Playlist { title: String, files: Vec<PathBuf> },
}

/// Runs one download of one reference: fetch, then (audio mode) transcode and
/// clean up the intermediate stream.
pub struct Executor {
    engine: Box<dyn MediaEngine>,
    transcoder: Box<dyn Transcoder>,
    observer: Box<dyn ProgressObserver>,
    options: FetchOptions,
    bitrate_kbps: u32,
}

impl Executor {
    pub fn new(
        config: &Config,
        output_dir: &Path,
        engine: Box<dyn MediaEngine>,
        transcoder: Box<dyn Transcoder>,
        observer: Box<dyn ProgressObserver>,
    ) -> Self {
        Self {
            engine,
            transcoder,
            observer,
            options: FetchOptions::new(config, output_dir),
            bitrate_kbps: config.bitrate_kbps,
        }
    }

    pub async fn attempt(&self, url: &SourceRef) -> Result<Delivered, AttemptError> {
        let Fetched { files, playlist } = self
            .engine
            .fetch(url, &self.options, self.observer.as_ref())
            .await?;

        let mut delivered = Vec::with_capacity(files.len());
        for file in &files {
            delivered.push(self.finish(file).await?);
        }

        match playlist {
            Some(title) => Ok(Delivered::Playlist {
                title,
                files: delivered,
            }),
            None => match (files.into_iter().next(), delivered.into_iter().next()) {
                (Some(file), Some(path)) => Ok(Delivered::File {
                    title: file.title,
                    path,
                }),
                _ => Err(AttemptError::Unexpected(
                    "engine finished without producing a file".to_string(),
                )),
            },
        }
    }

    async fn finish(&self, file: &MediaFile) -> Result<PathBuf, AttemptError> {
        let output = match self.options.mode {
            MediaMode::Video => file.path.clone(),
            MediaMode::Audio => {
                let request = TranscodeRequest {
                    input: file.path.clone(),
                    cover: file.thumbnail.clone(),
                    bitrate_kbps: self.bitrate_kbps,
                };
                let mp3 = self
                    .transcoder
                    .transcode(&request)
                    .await
                    .map_err(|e| AttemptError::Unexpected(e.to_string()))?;

                if mp3 != file.path {
                    remove_quietly(&file.path).await;
                }
                if let Some(thumb) = &file.thumbnail {
                    remove_quietly(thumb).await;
                }
                mp3
            }
        };

        match tokio::fs::try_exists(&output).await {
            Ok(true) => Ok(output),
            Ok(false) => Err(AttemptError::Unexpected(format!(
                "expected output {} is missing",
                output.display()
            ))),
            Err(e) => Err(AttemptError::Unexpected(e.to_string())),
        }
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Could not remove {}: {}", path.display(), e);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        engine::TranscodeError,
        progress::{NoProgress, ProgressEvent},
    };

    /// Engine that writes `<title>.webm` (and a cover) into the output dir,
    /// failing the first `fail_first` calls.
    pub(crate) struct FakeEngine {
        pub calls: Arc<AtomicUsize>,
        pub fail_first: usize,
        pub playlist: Option<Vec<&'static str>>,
    }

    impl FakeEngine {
        pub(crate) fn new(fail_first: usize) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                fail_first,
                playlist: None,
            }
        }
    }

    #[async_trait]
    impl MediaEngine for FakeEngine {
        async fn fetch(
            &self,
            _url: &SourceRef,
            options: &FetchOptions,
            observer: &dyn ProgressObserver,
        ) -> Result<Fetched, EngineError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(EngineError::Download(format!("network down ({call})")));
            }

            for percent in [0.0, 50.0, 100.0] {
                observer.on_progress(&ProgressEvent {
                    percent: Some(percent),
                    speed: Some(1024.0),
                    eta: Some(1),
                });
            }
            observer.on_finished();

            let titles = self.playlist.clone().unwrap_or_else(|| vec!["Song"]);
            let mut files = Vec::new();
            for title in titles {
                let path = options.output_dir.join(format!("{title}.webm"));
                let cover = options.output_dir.join(format!("{title}.jpg"));
                tokio::fs::write(&path, b"stream").await?;
                tokio::fs::write(&cover, b"cover").await?;
                files.push(MediaFile {
                    title: title.to_string(),
                    path,
                    thumbnail: Some(cover),
                });
            }

            Ok(Fetched {
                files,
                playlist: self.playlist.as_ref().map(|_| "Mix".to_string()),
            })
        }
    }

    pub(crate) struct FakeTranscoder {
        pub fail: bool,
    }

    #[async_trait]
    impl Transcoder for FakeTranscoder {
        async fn transcode(&self, request: &TranscodeRequest) -> Result<PathBuf, TranscodeError> {
            if self.fail {
                return Err(TranscodeError::Failed("bad codec".into()));
            }
            let out = request.input.with_extension("mp3");
            tokio::fs::write(&out, b"mp3").await?;
            Ok(out)
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ProgressEvent>>);

    impl ProgressObserver for Arc<Recorder> {
        fn on_progress(&self, event: &ProgressEvent) {
            self.0.lock().unwrap().push(*event);
        }
    }

    fn url() -> SourceRef {
        SourceRef::parse("https://youtu.be/abc", &Config::default()).unwrap()
    }

    #[tokio::test]
    async fn audio_attempt_leaves_only_mp3() {
        let tmp = tempfile::tempdir().unwrap();
        let recorder = Arc::new(Recorder::default());
        let executor = Executor::new(
            &Config::default(),
            tmp.path(),
            Box::new(FakeEngine::new(0)),
            Box::new(FakeTranscoder { fail: false }),
            Box::new(recorder.clone()),
        );

        let delivered = executor.attempt(&url()).await.unwrap();
        assert_eq!(
            delivered,
            Delivered::File {
                title: "Song".to_string(),
                path: tmp.path().join("Song.mp3"),
            }
        );
        assert!(tmp.path().join("Song.mp3").exists());
        assert!(!tmp.path().join("Song.webm").exists());
        assert!(!tmp.path().join("Song.jpg").exists());

        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].percent, Some(100.0));
    }

    #[tokio::test]
    async fn video_attempt_keeps_stream() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            mode: MediaMode::Video,
            ..Config::default()
        };
        let executor = Executor::new(
            &config,
            tmp.path(),
            Box::new(FakeEngine::new(0)),
            Box::new(FakeTranscoder { fail: true }),
            Box::new(NoProgress),
        );

        let delivered = executor.attempt(&url()).await.unwrap();
        assert_eq!(
            delivered,
            Delivered::File {
                title: "Song".to_string(),
                path: tmp.path().join("Song.webm"),
            }
        );
    }

    #[tokio::test]
    async fn engine_failure_is_download_error() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = Executor::new(
            &Config::default(),
            tmp.path(),
            Box::new(FakeEngine::new(1)),
            Box::new(FakeTranscoder { fail: false }),
            Box::new(NoProgress),
        );

        let err = executor.attempt(&url()).await.unwrap_err();
        assert_eq!(err, AttemptError::Download("network down (0)".into()));
    }

    #[tokio::test]
    async fn transcode_failure_is_unexpected() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = Executor::new(
            &Config::default(),
            tmp.path(),
            Box::new(FakeEngine::new(0)),
            Box::new(FakeTranscoder { fail: true }),
            Box::new(NoProgress),
        );

        let err = executor.attempt(&url()).await.unwrap_err();
        assert!(matches!(err, AttemptError::Unexpected(ref m) if m.contains("bad codec")));
    }

    #[tokio::test]
    async fn playlist_is_one_unit() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = FakeEngine {
            playlist: Some(vec!["One", "Two"]),
            ..FakeEngine::new(0)
        };
        let executor = Executor::new(
            &Config::default(),
            tmp.path(),
            Box::new(engine),
            Box::new(FakeTranscoder { fail: false }),
            Box::new(NoProgress),
        );

        match executor.attempt(&url()).await.unwrap() {
            Delivered::Playlist { title, files } => {
                assert_eq!(title, "Mix");
                assert_eq!(
                    files,
                    vec![tmp.path().join("One.mp3"), tmp.path().join("Two.mp3")]
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    struct EmptyEngine;

    #[async_trait]
    impl MediaEngine for EmptyEngine {
        async fn fetch(
            &self,
            _url: &SourceRef,
            _options: &FetchOptions,
            _observer: &dyn ProgressObserver,
        ) -> Result<Fetched, EngineError> {
            Ok(Fetched::default())
        }
    }

    #[tokio::test]
    async fn success_without_file_is_unexpected() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = Executor::new(
            &Config::default(),
            tmp.path(),
            Box::new(EmptyEngine),
            Box::new(FakeTranscoder { fail: false }),
            Box::new(NoProgress),
        );

        assert!(matches!(
            executor.attempt(&url()).await,
            Err(AttemptError::Unexpected(_))
        ));
    }
}
