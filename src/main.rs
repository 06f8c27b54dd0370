//! Archiver worker binary
//!
//! Reads its configuration from the environment and runs passes until stopped.
//! Articles go to an in-memory store, so a run doubles as a dry run against a
//! live server; fragments are staged on disk under `ARCHIVE_STAGING_DIR`.

use nntp_archiver::{Archiver, ArchiverConfig, FsStaging, MailParserDecoder, MemoryStore};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match ArchiverConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Archiving from {}:{} (tls: {}), staging in {}",
        config.server.host,
        config.server.port,
        config.server.tls,
        config.staging_dir.display()
    );

    let staging = FsStaging::new(config.staging_dir.clone());
    let archiver = Archiver::new(config, MemoryStore::new(), staging, MailParserDecoder);
    archiver.run_forever().await;

    ExitCode::SUCCESS
}
