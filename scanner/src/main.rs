mod camera;
mod decoder;
mod dedup;
mod display;
mod reporter;
mod scan_loop;

use camera::{CameraSetupError, CameraSource};
use decoder::{DecoderError, QrDecoder};
use reporter::{HttpReporter, ReporterError};
use scan_loop::{LoopExit, ScanLoop};
use scan_relay_common::config::{Config, ConfigError};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{error, info};

const CONFIG_ENV: &str = "SCAN_RELAY_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "scan-relay.toml";
const EXIT_CONFIG: i32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("decoder setup failed: {0}")]
    Decoder(#[from] DecoderError),
    #[error("webcam setup failed: {0}")]
    Camera(#[from] CameraSetupError),
    #[error("HTTP setup failed: {0}")]
    Http(#[from] ReporterError),
}

impl SetupError {
    /// Negative codes surface as 255, 254 and 253 on Unix.
    pub fn exit_code(&self) -> i32 {
        match self {
            SetupError::Decoder(_) => -1,
            SetupError::Camera(_) => -2,
            SetupError::Http(_) => -3,
        }
    }
}

/// `$SCAN_RELAY_CONFIG` if set, else `./scan-relay.toml` if present, else defaults.
fn load_config(env_path: Option<PathBuf>) -> Result<Config, ConfigError> {
    match env_path {
        Some(path) => Config::load(&path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            Config::load(Path::new(DEFAULT_CONFIG_FILE))
        }
        None => Ok(Config::default()),
    }
}

#[tokio::main]
async fn main() {
    let mut config = match load_config(std::env::var_os(CONFIG_ENV).map(PathBuf::from)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(EXIT_CONFIG);
        }
    };
    if let Some(destination) = std::env::args().nth(1) {
        config.http.destination = destination;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        destination = config.http.destination,
        camera = config.camera.index,
        scan_interval = config.scan.interval,
        "starting scan-relay"
    );

    let code = match run(config).await {
        Ok(exit) => {
            if let LoopExit::CaptureFailed(e) = &exit {
                error!(error = %e, "scanning stopped on capture failure");
            }
            exit.exit_code()
        }
        Err(e) => {
            error!(error = %e, "setup failed");
            e.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run(config: Config) -> Result<LoopExit, SetupError> {
    let decoder = QrDecoder::from_config(&config.decoder)?;
    let display = display::open(&config.display, config.camera.width, config.camera.height);
    let source = CameraSource::open(&config.camera).await?;
    let reporter = HttpReporter::new(&config.http)?;
    info!(destination = %reporter.destination(), "using webcam server");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping after current frame");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut scan =
        ScanLoop::new(source, decoder, reporter, display, &config.scan).with_shutdown(shutdown_rx);
    let exit = scan.run().await;

    let stats = scan.stats();
    info!(
        frames = stats.frames,
        scans = stats.scans,
        reports = stats.reports,
        report_failures = stats.report_failures,
        last_seen = scan.last_seen().map(|p| p.as_str()).unwrap_or("(none)"),
        "scan loop stopped"
    );
    Ok(exit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scan_relay_common::config::{DecoderConfig, HttpConfig};

    #[test]
    fn setup_failures_have_distinct_exit_codes() {
        let decoder = SetupError::from(
            QrDecoder::from_config(&DecoderConfig {
                symbologies: vec![],
            })
            .unwrap_err(),
        );
        let camera = SetupError::from(CameraSetupError::Unavailable);
        let http = SetupError::from(
            HttpReporter::new(&HttpConfig {
                destination: "mailto:ops@example.com".into(),
                timeout_secs: None,
            })
            .unwrap_err(),
        );

        let codes = [decoder.exit_code(), camera.exit_code(), http.exit_code()];
        assert_eq!(codes, [-1, -2, -3]);
        assert!(!codes.contains(&0));
        assert!(!codes.contains(&EXIT_CONFIG));
        assert!(!codes.contains(&LoopExit::CAPTURE_FAILED_CODE));
    }

    #[test]
    fn loop_exit_codes_distinguish_capture_failure() {
        assert_eq!(LoopExit::Cancelled.exit_code(), 0);
        assert_eq!(
            LoopExit::CaptureFailed(camera::CaptureError::Disconnected).exit_code(),
            2
        );
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let result = load_config(Some(PathBuf::from("/nonexistent/scan-relay.toml")));
        assert!(matches!(result, Err(ConfigError::ReadFile(..))));
    }

    #[cfg(not(feature = "camera"))]
    #[tokio::test]
    async fn camera_setup_fails_without_backend() {
        let err = CameraSource::open(&Default::default()).await.unwrap_err();
        assert!(matches!(err, CameraSetupError::Unavailable));
        assert!(err.to_string().contains("--features camera,window"));
    }
}
