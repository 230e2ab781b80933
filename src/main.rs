// Impactor - JSON-lines impact simulation service on stdin/stdout

use tracing_subscriber::EnvFilter;

fn main() {
    // Logs go to stderr; stdout carries responses only
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = impactor::run() {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}
