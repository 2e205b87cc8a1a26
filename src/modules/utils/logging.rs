use env_logger::{Builder, Env, WriteStyle};
use log::{info, warn};
use std::fs::OpenOptions;
use std::path::Path;

/// Initialize the logging system
///
/// `level` is the default filter; `RUST_LOG` still wins when set. Output goes
/// to `log_file` (appended) when given, otherwise to stderr.
pub fn initialize_logging(
    level: &str,
    log_file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = Builder::from_env(Env::default().default_filter_or(level));
    builder
        // Enable timestamps
        .format_timestamp_secs()
        // Enable module path in logs
        .format_module_path(true)
        .write_style(WriteStyle::Auto);

    if let Some(path) = log_file {
        // Create or append to log file
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init()?;

    info!("Logging system initialized");
    Ok(())
}

/// Helper function to mask identifiers before they reach the log
fn format_sensitive(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

/// Structured log line for an authentication outcome
///
/// Never pass passwords, digests or tokens as `details`.
pub fn log_auth_event(event_type: &str, username: &str, success: bool, details: Option<&str>) {
    if success {
        info!(
            "Auth event: type={}, user={}, success=true, details={:?}",
            event_type,
            format_sensitive(username),
            details
        );
    } else {
        warn!(
            "Auth event: type={}, user={}, success=false, details={:?}",
            event_type,
            format_sensitive(username),
            details
        );
    }
}
