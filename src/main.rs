//! Catalog Release Sync - publish an app image and propose the matching
//! catalog update, idempotently.

use catalog_release_sync::EnvConfig;
use catalog_release_sync::cli;
use catalog_release_sync::cli::OutputManager;
use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let env = EnvConfig::from_process();
    match cli::run(&env).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            let output = OutputManager::new(false, false);
            output.error(&format!("Fatal error: {e}"));
            for suggestion in e.recovery_suggestions() {
                let _ = output.indent(&suggestion);
            }
            process::exit(1);
        }
    }
}
