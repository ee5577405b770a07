mod cli;
mod config;
mod model;
mod overlay;
mod rehydrate;
mod storage;
mod surface;
mod tailer;
#[cfg(test)]
mod test_support;

use std::{io, process};

use tracing_subscriber::EnvFilter;

fn main() {
    // Stdout carries the headless wire protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = cli::run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
