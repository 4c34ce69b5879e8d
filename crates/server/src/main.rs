//! Packtrace server - photographs of pack codes in, audit rows out.

mod routes;

use std::path::Path;
use std::sync::Arc;

use packtrace_core::{ConfigError, RecognizerConfig, ScanConfig};
use packtrace_ocr::{ScanPipeline, TextRecognizer};
use packtrace_sheets::SheetsClient;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "packtrace=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config()?;

    let recognizer = build_recognizer(&config.recognizer);
    let pipeline = ScanPipeline::new(recognizer, &config)?;

    let sheets = if config.sheets_enabled() {
        let client = SheetsClient::from_config(reqwest::Client::new(), &config.sheets)?;
        info!(spreadsheet = %config.sheets.spreadsheet_id, "sheets audit trail enabled");
        Some(Arc::new(client))
    } else {
        warn!("sheets not configured; /api/log is disabled");
        None
    };

    let bind_addr = config.server.bind_addr.clone();
    let max_upload = config.server.max_upload_bytes;
    let state = AppState {
        pipeline: Arc::new(pipeline),
        sheets,
        config: Arc::new(config),
    };

    let app = routes::router(state, max_upload);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server listening on http://{bind_addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

/// `PACKTRACE_CONFIG` names the config file; default is `packtrace.toml` in
/// the working directory. A missing file means defaults, a malformed one is
/// fatal.
fn load_config() -> anyhow::Result<ScanConfig> {
    let path = std::env::var("PACKTRACE_CONFIG").unwrap_or_else(|_| "packtrace.toml".to_string());
    match ScanConfig::load(Path::new(&path)) {
        Ok(cfg) => {
            info!(%path, "loaded configuration");
            Ok(cfg)
        }
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(%path, "no config file found, using defaults");
            Ok(ScanConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(feature = "tesseract")]
fn build_recognizer(cfg: &RecognizerConfig) -> Box<dyn TextRecognizer> {
    use packtrace_ocr::recognizer::tesseract_backend::TesseractRecognizer;
    info!(lang = %cfg.lang, psm = cfg.psm, "using tesseract recognizer");
    Box::new(TesseractRecognizer::new(None, &cfg.lang, cfg.psm))
}

#[cfg(not(feature = "tesseract"))]
fn build_recognizer(_cfg: &RecognizerConfig) -> Box<dyn TextRecognizer> {
    use packtrace_ocr::MockRecognizer;
    warn!("built without the `tesseract` feature; every scan will read empty text");
    Box::new(MockRecognizer::new(""))
}
