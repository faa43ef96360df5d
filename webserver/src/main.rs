//! Supervisor service entry point
//!
//! Loads the fleet configuration, starts every enabled channel, runs the
//! health monitor and serves the HTTP/WebSocket surface until Ctrl+C.

use clap::Parser;
use shared::logging;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

use supervisor::{Fleet, JsonConfigStore};
use webserver::{WebServer, WebServerResult};

#[derive(Parser, Debug)]
#[command(name = "webserver")]
#[command(about = "Supervises relay worker channels and serves their live status")]
struct Args {
    /// Fleet configuration document
    #[arg(long, env = "SUPERVISOR_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Port for HTTP server (browser connections)
    #[arg(long, default_value = "8000")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Frontend directory (index.html plus static/)
    #[arg(long, default_value = "frontend")]
    static_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => logging::log_shutdown("webserver", "Received Ctrl+C signal"),
        Err(err) => {
            logging::log_error("webserver", "Signal handling", &err);
            // Without a signal handler the only way out is killing the process
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> WebServerResult<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    logging::init_tracing(Some(&args.log_level));
    logging::log_startup("webserver", &format!("config {}", args.config.display()));

    let store = Arc::new(JsonConfigStore::new(&args.config));
    let fleet = Fleet::load(store).await?;

    fleet.start_all().await;
    let health_monitor = fleet.spawn_health_monitor();

    let server = WebServer::new(Arc::clone(&fleet), &args.static_dir);
    let result = server.run(SocketAddr::new(args.bind, args.port), shutdown_signal()).await;

    health_monitor.abort();
    fleet.stop_all().await;

    match result {
        Ok(()) => {
            logging::log_success("webserver", "Stopped gracefully");
            Ok(())
        }
        Err(e) => {
            logging::log_error("webserver", "HTTP server", &e);
            Err(e)
        }
    }
}
