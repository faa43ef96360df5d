//! Configuration documents and frontend files for webserver tests

use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;

pub const INDEX_HTML: &str = "<!DOCTYPE html><html><body><h1>Channels</h1></body></html>";
pub const APP_JS: &str = "console.log('channels');";

/// Worker that idles after one line of output
pub fn idle_worker() -> Value {
    json!(["sh", "-c", "echo 'relay {channel_name} on {ingress_url}'; exec sleep 30"])
}

pub fn config_document(dir: &TempDir, channels: Value) -> Value {
    json!({
        "log_directory": dir.path().join("logs"),
        "ingress_base_port": 9000,
        "multicast_base_address": "239.1.1.1",
        "multicast_base_port": 5000,
        "multicast_interface": "127.0.0.1",
        "service_id_base": 100,
        "command_template": idle_worker(),
        "timings": {
            "sweep_interval": 0.05,
            "crash_restart_delay": 0.1,
            "termination_grace": 0.5,
            "broadcast_timeout": 0.5,
            "initial_settle": 0.01
        },
        "channels": channels
    })
}

pub fn write_config(dir: &TempDir, document: &Value) -> PathBuf {
    let path = dir.path().join("config.json");
    std::fs::write(&path, serde_json::to_string_pretty(document).unwrap()).unwrap();
    path
}

/// Frontend directory with an index page and one asset
pub fn write_frontend(dir: &TempDir) -> PathBuf {
    let root = dir.path().join("frontend");
    std::fs::create_dir_all(root.join("static/js")).unwrap();
    std::fs::write(root.join("index.html"), INDEX_HTML).unwrap();
    std::fs::write(root.join("static/js/app.js"), APP_JS).unwrap();
    root
}
