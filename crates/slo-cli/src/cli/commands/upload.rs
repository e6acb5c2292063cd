//! `slo-upload upload` – segment a file, upload in parallel, write the SLO manifest.

use anyhow::{bail, Context, Result};
use slo_core::budget::DiskBudget;
use slo_core::config::SloConfig;
use slo_core::planner::{UploadPlan, MIB};
use slo_core::progress::ProgressStats;
use slo_core::retry::RetryPolicy;
use slo_core::store::{HttpOptions, ObjectStore, StoreError, SwiftClient};
use slo_core::{UploadOptions, UploadOutcome};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use crate::cli::UploadArgs;

const PROGRESS_INTERVAL_MS: u64 = 500;

/// Config values overridden by whatever flags were given. Sizes on the command
/// line are MiB; a disk ceiling of 0 means none.
pub(crate) fn build_options(cfg: &SloConfig, args: &UploadArgs) -> UploadOptions {
    let mut opts = UploadOptions::from_config(cfg, &args.container);
    opts.object_name = args.object_name.clone();
    if let Some(segments) = &args.segments_container {
        opts.segments_container = Some(segments.clone());
    }
    if let Some(mb) = args.segment_size {
        opts.segment_size = mb.saturating_mul(MIB);
    }
    if let Some(n) = args.concurrency {
        opts.concurrency = n;
    }
    if let Some(mb) = args.max_disk_space {
        opts.max_disk_space = (mb > 0).then(|| mb.saturating_mul(MIB));
    }
    if let Some(dir) = &args.temp_dir {
        opts.temp_dir = dir.clone();
    }
    if let Some(n) = args.max_segments {
        opts.limits.max_segments = n;
    }
    opts
}

fn format_size(bytes: u64) -> String {
    if bytes < MIB {
        format!("{} bytes", bytes)
    } else if bytes % MIB == 0 {
        format!("{} MiB", bytes / MIB)
    } else {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    }
}

/// What is about to happen, including any adjustment made to the requested settings.
pub(crate) fn plan_summary(plan: &UploadPlan, budget: &DiskBudget, options: &UploadOptions) -> String {
    let mut lines = Vec::new();
    if plan.segment_size != options.segment_size {
        lines.push(format!(
            "Unable to use {} as segment size due to the {} segment limit; using {}.",
            format_size(options.segment_size),
            options.limits.max_segments,
            format_size(plan.segment_size)
        ));
    }
    if budget.is_disk_limited(plan.segment_count) {
        lines.push(format!(
            "Concurrent uploads lowered from {} to {} to fit in {} of local disk space.",
            budget.requested_concurrency,
            budget.max_concurrent_segments,
            format_size(options.max_disk_space.unwrap_or(0))
        ));
    }
    lines.push(format!("Object:             {}", plan.manifest_path()));
    lines.push(format!(
        "Segments:           {} x {} in {}",
        plan.segment_count,
        format_size(plan.segment_size),
        plan.segments_container
    ));
    lines.push(format!("Concurrent uploads: {}", budget.max_concurrent_segments));
    lines.push(format!(
        "Local disk used:    up to {}",
        format_size(plan.segment_size.saturating_mul(budget.max_concurrent_segments as u64))
    ));
    lines.join("\n")
}

pub(crate) fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

async fn confirm() -> Result<bool> {
    print!("Proceed with upload? [y/N] ");
    io::stdout().flush()?;
    let answer = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        io::stdin().read_line(&mut line).map(|_| line)
    })
    .await??;
    Ok(is_yes(&answer))
}

fn swift_client(cfg: &SloConfig, args: &UploadArgs) -> Result<SwiftClient> {
    let retry = cfg.retry.as_ref().map(RetryPolicy::from).unwrap_or_default();
    let http = cfg.http.as_ref().map(HttpOptions::from).unwrap_or_default();
    let client = SwiftClient::new(&args.storage_url, &args.auth_token)
        .with_context(|| format!("invalid storage URL {:?}", args.storage_url))?
        .with_retry(retry)
        .with_http_options(http);
    Ok(client)
}

pub async fn run_upload(cfg: &SloConfig, args: UploadArgs) -> Result<()> {
    let options = build_options(cfg, &args);
    let client = swift_client(cfg, &args)?;
    let store: Arc<dyn ObjectStore> = Arc::new(client.clone());

    // Plans only; no remote I/O yet.
    let coordinator = slo_core::prepare_upload(&args.file, &options, store)?;

    if !args.skip_auth_check {
        let container = options.container.clone();
        let probed = tokio::task::spawn_blocking(move || client.head_container(&container)).await?;
        match probed {
            Ok(()) => {}
            Err(e) if e.is_auth_failure() => {
                return Err(e).context(
                    "invalid authentication information; check the storage URL and token",
                );
            }
            Err(StoreError::Http { status: 404, .. }) => {
                bail!("container {:?} does not exist", options.container);
            }
            Err(e) => return Err(e).context("could not reach the object store"),
        }
    }

    if !args.quiet {
        println!(
            "{}",
            plan_summary(coordinator.plan(), coordinator.budget(), &options)
        );
    }
    if !args.yes && !confirm().await? {
        bail!("upload cancelled");
    }

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<ProgressStats>(16);
    let quiet = args.quiet;
    let progress_handle = tokio::spawn(async move {
        let mut last_print = Instant::now();
        let mut printed = false;
        while let Some(stats) = progress_rx.recv().await {
            if quiet {
                continue;
            }
            let now = Instant::now();
            if now.duration_since(last_print).as_millis() as u64 >= PROGRESS_INTERVAL_MS
                || stats.is_complete()
            {
                let done_mib = stats.bytes_done as f64 / MIB as f64;
                let total_mib = stats.total_bytes as f64 / MIB as f64;
                let rate_mib = stats.bytes_per_sec() / MIB as f64;
                let eta = stats
                    .eta_secs()
                    .map(|s| format!("{:.0}s", s))
                    .unwrap_or_else(|| "?".to_string());
                println!(
                    "\r  {:.1} / {:.1} MiB ({:.1}%)  {}/{} segments  {:.2} MiB/s  ETA {}  ",
                    done_mib,
                    total_mib,
                    stats.fraction() * 100.0,
                    stats.segments_done,
                    stats.segment_count,
                    rate_mib,
                    eta
                );
                last_print = now;
                printed = true;
            }
        }
        if printed {
            println!();
        }
    });

    let coordinator = coordinator.with_progress(progress_tx);
    let outcome =
        tokio::task::spawn_blocking(move || UploadOutcome::from_run(coordinator.run())).await?;

    let _ = progress_handle.await;

    match outcome {
        UploadOutcome::Success(path) => {
            tracing::info!(object = %path, "upload complete");
            println!("Uploaded {}", path);
            Ok(())
        }
        other => bail!("{}", other),
    }
}
