use crate::shared::paths::ClientPaths;
use std::fs;
use std::io::Write;

/// Appends one JSON line to the client log. Logging is an observability
/// side-channel: any failure here is swallowed rather than propagated.
pub fn append_client_log(paths: &ClientPaths, level: &str, event: &str, message: &str) {
    let payload = serde_json::json!({
        "timestamp": crate::shared::time::now_secs(),
        "level": level,
        "event": event,
        "message": message,
    });

    let Ok(line) = serde_json::to_string(&payload) else {
        return;
    };

    let path = paths.client_log_path();
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };
    let _ = writeln!(file, "{line}");
}
