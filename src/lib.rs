//! # tunedl
//!
//! Saves media from a handful of supported sites into a local directory,
//! transcoded to MP3 by default. The heavy lifting is done by external tools:
//! [yt-dlp](https://github.com/yt-dlp/yt-dlp) fetches the stream and `ffmpeg`
//! transcodes it. This crate validates the URLs, prepares the output
//! directory, retries failed items, and reports progress and a summary.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tunedl::{
//!     app::{self, Capabilities, Sources},
//!     config::Config,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!
//!     // Fails when yt-dlp or ffmpeg are not on PATH
//!     let capabilities = Capabilities::production(&config).unwrap();
//!
//!     let sources = Sources {
//!         url: Some("https://www.youtube.com/watch?v=...".to_string()),
//!         batch: None,
//!     };
//!
//!     let summary = app::run(
//!         &config,
//!         &sources,
//!         capabilities,
//!         tunedl::console::stdin_lines,
//!         &mut std::io::stdout(),
//!         || std::future::pending::<()>(),
//!     )
//!     .await
//!     .unwrap();
//!
//!     println!("{}", summary);
//! }
//! ```
//!
//! The engine and transcoder are traits ([`engine::MediaEngine`],
//! [`engine::Transcoder`]) so the workflow can be driven without the real
//! binaries.

#![forbid(unsafe_code)]
#[macro_use]
extern crate log;

pub mod app;
pub mod batch;
pub mod cli;
pub mod config;
pub mod console;
pub mod engine;
pub mod executor;
pub mod ffmpeg;
pub mod output;
pub mod progress;
pub mod retry;
pub mod util;
pub mod validate;
pub mod ytdlp;
