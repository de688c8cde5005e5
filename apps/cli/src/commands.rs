//! Command implementations

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tracing::warn;
use unpacker::{
    ApiKey, ConsoleEventSink, DownloadConfig, IntoEventCallback, OptionalModPolicy, RunSummary,
    Unpacker,
};

use crate::UnpackArgs;

/// Print the pack summary; always succeeds once the manifest is readable
pub async fn verify(archive: &Path, details: bool) -> Result<bool> {
    if details {
        let loaded = Unpacker::load_manifest(archive)
            .await
            .with_context(|| format!("Failed to verify {}", archive.display()))?;
        println!("{}", loaded.manifest().describe());
    } else {
        let info = Unpacker::verify(archive)
            .await
            .with_context(|| format!("Failed to verify {}", archive.display()))?;
        println!("{}", info);
    }
    Ok(true)
}

/// Run a full unpack; returns false when any mod failed or the run was cancelled
pub async fn unpack(args: UnpackArgs, quiet: bool) -> Result<bool> {
    let config = build_config(&args)?;
    let api_key = ApiKey::resolve(args.api_key.clone(), args.secrets.as_deref())
        .context("No CurseForge API key available")?;

    let modpack = Unpacker::load_manifest(&args.archive)
        .await
        .with_context(|| format!("Failed to load {}", args.archive.display()))?;

    let unpacker = Unpacker::new(config, api_key)?;

    let cancel = unpacker.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling remaining downloads");
            cancel.cancel();
        }
    });

    let summary = unpacker
        .run(
            modpack,
            &args.output,
            args.overrides,
            ConsoleEventSink::new(!quiet).into_callback(),
        )
        .await
        .with_context(|| format!("Failed to unpack into {}", args.output.display()))?;

    print_summary(&summary);
    Ok(summary.is_success())
}

fn build_config(args: &UnpackArgs) -> Result<DownloadConfig> {
    let mut builder = DownloadConfig::builder()
        .max_workers(args.workers)
        .timeout(Duration::from_secs(args.timeout))
        .download_timeout(Duration::from_secs(args.download_timeout))
        .max_retries(args.retries)
        .optional_mods(if args.skip_optional {
            OptionalModPolicy::Skip
        } else {
            OptionalModPolicy::Download
        });

    if let Some(base) = &args.api_base {
        builder = builder.api_base(base.as_str());
    }
    if let Some(base) = &args.download_base {
        builder = builder.download_base(base.as_str());
    }

    Ok(builder.build()?)
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "Mods: {} downloaded, {} failed, {} skipped of {} ({:.1}s)",
        summary.succeeded,
        summary.failed,
        summary.skipped,
        summary.total,
        summary.elapsed.as_secs_f64()
    );

    if let Some(report) = &summary.overrides {
        println!(
            "Overrides: {} files, {} directories, {} failed",
            report.extracted, report.directories, report.failed
        );
    }

    for failure in &summary.failures {
        println!("  failed {} [{}]: {}", failure.reference, failure.category, failure.message);
    }

    if summary.cancelled {
        println!("Run was cancelled.");
    }
}
