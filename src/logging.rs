use std::sync::OnceLock;

use chrono::{SecondsFormat, Utc};

static DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

fn debug_enabled() -> bool {
    *DEBUG_ENABLED.get_or_init(|| {
        std::env::var("JIRA_EXPORT_DEBUG")
            .ok()
            .map(|v| {
                let normalized = v.trim().to_ascii_lowercase();
                normalized == "1" || normalized == "true" || normalized == "yes"
            })
            .unwrap_or(false)
    })
}

fn emit(level: &str, message: &str) {
    eprintln!(
        "[{}][{}] {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        level,
        message
    );
}

pub fn debug(message: impl AsRef<str>) {
    if debug_enabled() {
        emit("DEBUG", message.as_ref());
    }
}

pub fn info(message: impl AsRef<str>) {
    emit("INFO", message.as_ref());
}

pub fn warn(message: impl AsRef<str>) {
    emit("WARN", message.as_ref());
}

pub fn error(message: impl AsRef<str>) {
    emit("ERROR", message.as_ref());
}
