use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use bucket_mirror::runner::{on_interrupt, Interrupt};
use bucket_mirror::{Mirror, MirrorConfig, MirrorOptions, S3Store};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Fetch failures are reported but still exit 0; only configuration,
/// listing, local-root and snapshot errors fail the process.
async fn run() -> anyhow::Result<()> {
    let config = MirrorConfig::from_env().context("configuration error")?;
    println!("{}", config.bucket);

    let store = S3Store::from_config(&config);
    let mirror = Mirror::new(Arc::new(store), MirrorOptions::from(&config));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match on_interrupt(&on_signal) {
                Interrupt::Drain => {
                    info!("interrupt received, finishing in-flight downloads (Ctrl-C again to force exit)")
                }
                Interrupt::ForceExit => {
                    warn!("second interrupt, exiting without waiting for downloads");
                    std::process::exit(130);
                }
            }
        }
    });

    let result = mirror
        .run(&cancel)
        .await
        .with_context(|| format!("mirroring bucket {} failed", config.bucket))?;

    println!("{}", result);
    Ok(())
}
