//! Configuration documents and worker scripts for integration tests

use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestFixtures;

impl TestFixtures {
    /// Worker that idles after one line of output
    pub fn idle_worker() -> Value {
        json!(["sh", "-c", "echo 'relay {channel_name} service {service_id}'; exec sleep 30"])
    }

    /// Worker that exits immediately
    pub fn exiting_worker() -> Value {
        json!(["sh", "-c", "exit 1"])
    }

    /// Worker that reports progress once, then idles
    pub fn streaming_worker() -> Value {
        json!([
            "sh",
            "-c",
            "printf 'frame=  50 fps= 25 q=-1.0 size=1024kB time=00:00:02.00 bitrate=4194.3kbits/s speed=1x\\n'; exec sleep 30"
        ])
    }

    /// Full configuration document with fast timings
    pub fn config_document(dir: &TempDir, command_template: Value, channels: Value) -> Value {
        json!({
            "log_directory": dir.path().join("logs"),
            "ingress_base_port": 9000,
            "multicast_base_address": "239.1.1.1",
            "multicast_base_port": 5000,
            "multicast_interface": "127.0.0.1",
            "multicast_options": "pkt_size=1316",
            "service_id_base": 100,
            "command_template": command_template,
            "timings": {
                "sweep_interval": 0.05,
                "crash_restart_delay": 0.1,
                "termination_grace": 0.5,
                "broadcast_timeout": 0.2,
                "initial_settle": 0.01
            },
            "channels": channels
        })
    }

    /// Write `document` to `config.json` inside `dir`
    pub fn write_config(dir: &TempDir, document: &Value) -> PathBuf {
        let path = dir.path().join("config.json");
        std::fs::write(&path, serde_json::to_string_pretty(document).unwrap()).unwrap();
        path
    }
}
