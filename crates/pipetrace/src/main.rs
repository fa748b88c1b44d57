mod bootstrap;

use std::time::Duration;

use anyhow::Result;
use pipetrace_core::settings::{LastUsedParams, Settings};
use pipetrace_runtime::Transport;
use pipetrace_ui::app::{App, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let mut settings = Settings::load_with_last_used();

    let logs_dir = bootstrap::ensure_directories()?;
    let log_file = settings
        .log_file
        .clone()
        .unwrap_or_else(|| logs_dir.join(bootstrap::LOG_FILE_NAME));
    bootstrap::setup_logging(&settings.log_level, &log_file)?;

    tracing::info!("pipetrace v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Endpoint: {}, Theme: {}, Timezone: {}",
        settings.url,
        settings.theme,
        settings.timezone
    );

    // A replay owns the transport, so it wins over --connect.
    let mut initial = Vec::new();
    if let Some(path) = &settings.replay {
        if settings.connect {
            tracing::warn!("--connect ignored while replaying {}", path.display());
        }
        initial.push(Command::Replay(path.clone()));
    } else if settings.connect {
        initial.push(Command::Connect(settings.endpoint()?));
    }

    let (transport, rx) = Transport::new();
    let mut app = App::new(&settings.theme, &settings.timezone, settings.url.clone())
        .with_replay(
            settings.replay.clone(),
            Duration::from_millis(settings.settle_ms),
        );

    // The loop exits on 'q' / Ctrl+C inside the TUI. The OS-level signal covers
    // the window before raw mode is enabled.
    tokio::select! {
        result = app.run(transport, rx, initial) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received; shutting down");
        }
    }

    if !settings.clear {
        settings.url = app.url.clone();
        settings.theme = app.theme.name.to_string();
        if let Err(e) = LastUsedParams::from(&settings).save() {
            tracing::warn!(error = %e, "could not persist last-used parameters");
        }
    }

    tracing::info!("pipetrace exiting");
    Ok(())
}
