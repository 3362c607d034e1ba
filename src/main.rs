use std::path::PathBuf;

use clap::Parser;

use static_httpd::config::ServerConfig;
use static_httpd::logging;
use static_httpd::server::WorkerPool;

/// Serve a directory over HTTP/1.1 with a pool of event-loop workers.
#[derive(Debug, Parser)]
#[command(name = "static-httpd", version)]
struct Args {
    /// YAML config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of worker event loops
    #[arg(short, long)]
    workers: Option<usize>,

    /// Document root
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(short, long = "log-file")]
    log_file: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Close connections whose headers take longer than this many seconds
    #[arg(long = "header-timeout")]
    header_timeout: Option<u64>,
}

impl Args {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(root) = self.root {
            config.root = root;
        }
        if let Some(log_file) = self.log_file {
            config.log_file = Some(log_file);
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(secs) = self.header_timeout {
            config.header_timeout_secs = Some(secs);
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    let config = config.validate()?;

    logging::init(config.log_file.as_deref())?;

    WorkerPool::start(config)
}
