//! qrlink - QR capture and display sessions
//!
//! Terminal demo for the session library.
//!
//! # Overview
//!
//! - `qrlink display <TEXT>` renders `TEXT` as a QR code on the terminal's
//!   alternate screen and waits for q, Esc, Ctrl-C or the `--seconds` close
//!   timeout.
//! - `qrlink capture --image <PATH>` runs the capture flow with the image file
//!   standing in for a rear camera. Without `--image` the platform is treated
//!   as having no camera and the `--fallback` text is returned verbatim.
//!
//! # Execution Flow
//!
//! 1. Load `qrlink.yaml` (plus `QRLINK__*` overrides) from `--config-dir`
//! 2. Initialize logging → `<log-dir>/qrlink.<date>`, console on stderr
//!    except while the display owns the screen
//! 3. Run the session on a current-thread tokio runtime
//! 4. Log the metrics summary

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use qrlink::services::{MemoryTextBuffer, Platform, StaticAuthority, StillImageBackend};
use qrlink::ui::{
    CameraSurfaceFactory, CaptureLayout, IntervalClock, SessionController, TerminalDisplayFactory,
};
use qrlink::{APP_NAME, ConfigManager, Settings, VERSION};

#[derive(Parser)]
#[command(name = "qrlink")]
#[command(about = "Show and read QR codes through frame-driven sessions")]
#[command(version)]
struct Cli {
    /// Directory holding qrlink.yaml
    #[arg(long, default_value = "qrlink-data")]
    config_dir: Utf8PathBuf,

    /// Directory for log files
    #[arg(long, default_value = "logs")]
    log_dir: Utf8PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render text as a QR code in the terminal
    Display {
        text: String,

        /// Close automatically after this many seconds (0 waits for a close key)
        #[arg(short, long)]
        seconds: Option<f32>,
    },
    /// Read a QR code from an image acting as the camera
    Capture {
        /// Image file served as the rear camera
        #[arg(short, long)]
        image: Option<Utf8PathBuf>,

        /// Text buffer contents used when there is no camera
        #[arg(short, long, default_value = "")]
        fallback: String,

        /// Give up after this many seconds (0 waits for Ctrl-C)
        #[arg(short, long)]
        timeout: Option<f32>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.config_dir)?;
    let settings = config_manager.load_settings()?;

    // Console lines would scribble over the full-screen QR
    let console = !matches!(cli.command, Commands::Display { .. });
    let _guard = qrlink::logging::setup_logging_with_console(
        &cli.log_dir,
        "qrlink",
        cli.debug || settings.debug_mode,
        console,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::info!("Settings from {}", config_manager.settings_path());

    // Sessions are cooperative: one thread, every wait is a frame tick
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(cli.command, settings))
}

async fn run(command: Commands, mut settings: Settings) -> Result<()> {
    match command {
        Commands::Display { text, seconds } => {
            if let Some(seconds) = seconds {
                settings.display.close_timeout_seconds = seconds;
            }
            display(settings, &text).await
        }
        Commands::Capture {
            image,
            fallback,
            timeout,
        } => {
            if let Some(timeout) = timeout {
                settings.capture.cancel_timeout_seconds = timeout;
            }
            let text = capture(settings, image, fallback).await?;
            match text {
                Some(text) => println!("{text}"),
                None => eprintln!("No QR code read"),
            }
            Ok(())
        }
    }
}

async fn display(settings: Settings, text: &str) -> Result<()> {
    let factory = TerminalDisplayFactory::stdout();
    let buttons = factory.buttons();
    let clock = IntervalClock::new(settings.frame_rate);
    let mut controller = SessionController::new(
        settings,
        StaticAuthority::granted(Platform::Desktop),
        MemoryTextBuffer::default(),
        clock,
    );

    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, closing display");
            buttons.press_close();
        }
    });

    let result = controller.display(Some(&factory), text).await;
    ctrl_c.abort();
    controller.monitor().metrics().log_summary();
    Ok(result?)
}

async fn capture(
    mut settings: Settings,
    image: Option<Utf8PathBuf>,
    fallback: String,
) -> Result<Option<String>> {
    let clock = IntervalClock::new(settings.frame_rate);
    let text_buffer = MemoryTextBuffer::new(fallback);

    let Some(image) = image else {
        let mut controller = SessionController::new(
            settings,
            StaticAuthority::new(Platform::Console, false, false),
            text_buffer,
            clock,
        );
        let text = controller
            .capture::<CameraSurfaceFactory<StillImageBackend>>(None)
            .await?;
        controller.monitor().metrics().log_summary();
        return Ok(text);
    };

    settings.capture.desktop_camera = true;
    let factory = CameraSurfaceFactory::new(StillImageBackend::new(image), CaptureLayout::standard());
    let mut controller = SessionController::new(
        settings,
        StaticAuthority::granted(Platform::Desktop),
        text_buffer,
        clock,
    );

    let cancel = controller.cancel_handle();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, cancelling capture");
            cancel.cancel();
        }
    });

    let result = controller.capture(Some(&factory)).await;
    ctrl_c.abort();
    controller.monitor().metrics().log_summary();
    Ok(result?)
}
