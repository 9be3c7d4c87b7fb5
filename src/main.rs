use std::error::Error;
use std::path::Path;

use tracing_subscriber::EnvFilter;

use dealer_print::config::Settings;
use dealer_print::font_metrics;
use dealer_print::pdf::DirectorySink;
use dealer_print::preview::PreviewSurface;
use dealer_print::record::DocumentRecord;
use dealer_print::server::{router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let settings = Settings::load()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match font_metrics::discover(settings.font_path.as_deref()) {
        Some(font) => font_metrics::install(font)?,
        None => tracing::warn!("no usable font found, text will not be drawn"),
    }

    // `dealer-print <record.json>` exports once into the download directory
    if let Some(record_path) = std::env::args().nth(1) {
        return export_file(&settings, Path::new(&record_path)).await;
    }

    let app = router(AppState::new(settings.clone()));
    let listener = tokio::net::TcpListener::bind(settings.bind).await?;
    tracing::info!(addr = %settings.bind, "dealer print service listening");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn export_file(settings: &Settings, path: &Path) -> Result<(), Box<dyn Error>> {
    let content = std::fs::read_to_string(path)?;
    let record: DocumentRecord = serde_json::from_str(&content)?;

    let sink = DirectorySink::new(&settings.download_dir);
    // A record file on local disk is trusted to name any logo path or URL
    let mut surface = PreviewSurface::new(settings.capture_engine());
    surface.open(record);

    match surface.download(&sink).await {
        Ok(file) => {
            println!("{}", sink.path_for(&file).display());
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            Err(e.into())
        }
    }
}
