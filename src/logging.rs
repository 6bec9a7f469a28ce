use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::LogSettings;

const LOG_FILE_PREFIX: &str = "studyplan.log";

/// Keeps the non-blocking file writer flushing until dropped.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn file_layer(dir: &Path) -> std::io::Result<(BoxedLayer, FileLogGuard)> {
    std::fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .boxed();
    Ok((layer, FileLogGuard { _guard: guard }))
}

/// Installs the global subscriber: stdout always, a daily rolling file when
/// `settings.file_dir` is set and writable.
pub fn init_tracing(settings: &LogSettings) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(&settings.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let mut layers: Vec<BoxedLayer> = vec![fmt::layer().with_target(true).boxed()];
    let mut guard = None;
    let mut file_error = None;
    if let Some(dir) = settings.file_dir.as_deref() {
        match file_layer(dir) {
            Ok((layer, file_guard)) => {
                layers.push(layer);
                guard = Some(file_guard);
            }
            Err(err) => file_error = Some(err),
        }
    }

    tracing_subscriber::registry().with(layers).with(env_filter).init();

    match (&settings.file_dir, file_error) {
        (Some(dir), Some(err)) => {
            tracing::warn!(log_dir = %dir.display(), error = %err, "file logging disabled")
        }
        (Some(dir), None) => tracing::info!(log_dir = %dir.display(), "file logging enabled"),
        _ => {}
    }
    guard
}
