use std::process::ExitCode;

use clap::Parser;
use tunedl::{
    app::{self, AppError, Capabilities, Sources},
    cli::Cli,
    config::VERSION,
    console,
};

async fn interrupted() {
    // If the handler can't be installed, never report an interrupt.
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.into())
        .parse_default_env()
        .init();

    let config = cli.to_config();
    let sources = Sources {
        url: cli.url.clone(),
        batch: cli.batch.clone(),
    };

    println!("\ntunedl v{} - audio download tool", VERSION);

    let result = match Capabilities::production(&config) {
        Ok(capabilities) => {
            app::run(
                &config,
                &sources,
                capabilities,
                console::stdin_lines,
                &mut std::io::stdout(),
                interrupted,
            )
            .await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(summary) => {
            println!("\n{}\n", summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            match &e {
                AppError::Interrupted => println!("\nInterrupted by user"),
                AppError::Environment(_) => {
                    eprintln!("\nERROR: {}", e);
                    eprintln!("yt-dlp and ffmpeg must be installed and on PATH:");
                    eprintln!("  Linux:   sudo apt install ffmpeg && pipx install yt-dlp");
                    eprintln!("  macOS:   brew install ffmpeg yt-dlp");
                    eprintln!("  Windows: winget install ffmpeg yt-dlp");
                }
                _ => eprintln!("\nERROR: {}", e),
            }
            ExitCode::from(e.exit_code())
        }
    }
}
