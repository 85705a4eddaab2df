//! Subcommand implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use convertino_core::bundler::ArtifactSink;
use convertino_core::converter::merge_pdfs;
use convertino_core::{
    smart_convert_registry, tool_registry, BatchControl, BatchProgress, CancelHandle, Config,
    DirectorySink, HttpGateway, Outcome, RawFile, RemoteGateway, RouteRegistry, Session, Tool,
    ToolOptions,
};

const PROGRESS_BUFFER: usize = 32;

fn gateway(config: &Config) -> Result<Arc<dyn RemoteGateway>> {
    let gateway = HttpGateway::new(&config.service).context("Failed to create HTTP client")?;
    Ok(Arc::new(gateway))
}

pub fn list_routes(config: &Config) -> Result<()> {
    let registry = smart_convert_registry(gateway(config)?, &config.image)?;
    for (key, route) in registry.iter() {
        let targets: Vec<&str> = route
            .target_formats
            .iter()
            .map(|t| t.value.as_str())
            .collect();
        println!(
            "{:<6} {:<30} -> {}",
            key,
            route.source_label,
            targets.join(", ")
        );
    }
    Ok(())
}

pub fn list_tools() {
    for tool in Tool::ALL {
        println!("{:<20} {}", tool.as_str(), tool.label());
    }
}

pub async fn convert(
    config: &Config,
    from: &str,
    to: Option<&str>,
    zip: bool,
    paths: &[PathBuf],
) -> Result<()> {
    let gateway = gateway(config)?;
    let registry = smart_convert_registry(gateway.clone(), &config.image)?;
    run_batch(config, registry, gateway, from, to, zip, paths).await
}

pub async fn run_tool(
    config: &Config,
    id: &str,
    options: ToolOptions,
    to: Option<&str>,
    zip: bool,
    paths: &[PathBuf],
) -> Result<()> {
    let tool: Tool = id.parse()?;
    let gateway = gateway(config)?;
    let registry = tool_registry(tool, &options, gateway.clone(), &config.image)?;
    run_batch(config, registry, gateway, tool.as_str(), to, zip, paths).await
}

/// Merges PDFs in argument order into one file in the output directory.
pub async fn merge(config: &Config, paths: &[PathBuf], name: &str) -> Result<()> {
    let files = read_files(paths).await?;
    info!("Merging {} PDF(s)", files.len());

    let merged = tokio::task::spawn_blocking(move || merge_pdfs(&files))
        .await
        .context("Merge task failed")??;
    let data = merged
        .bytes_in_memory()
        .cloned()
        .context("Merged document has no content")?;

    let sink = DirectorySink::new(&config.output.dir);
    let saved = sink.save(name, data).await?;
    println!("{}", saved.location);
    Ok(())
}

async fn read_files(paths: &[PathBuf]) -> Result<Vec<RawFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = RawFile::from_path(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.push(file);
    }
    Ok(files)
}

async fn run_batch(
    config: &Config,
    registry: RouteRegistry,
    gateway: Arc<dyn RemoteGateway>,
    source: &str,
    target: Option<&str>,
    zip: bool,
    paths: &[PathBuf],
) -> Result<()> {
    let sink = Arc::new(DirectorySink::new(&config.output.dir));
    let mut session = Session::new(config, registry, gateway, sink);

    let route = session.select_source(source)?;
    let target = match target {
        Some(target) => target.to_string(),
        None => route
            .default_target()
            .map(|t| t.value.clone())
            .with_context(|| format!("Route '{}' has no target formats", route.route_id))?,
    };
    if !route.is_local_for(&target) {
        session.spawn_warmup();
    }

    let report = session.add_files(read_files(paths).await?);
    for rejection in &report.rejected {
        warn!("Skipping {}: {}", rejection.name, rejection.reason);
    }
    if session.files().is_empty() {
        bail!("No usable input files");
    }

    let cancel = CancelHandle::new();
    spawn_interrupt_handler(cancel.clone());
    let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
    let progress = tokio::spawn(log_progress(rx));

    let job = session
        .convert_with(
            &target,
            BatchControl::default().with_progress(tx).with_cancel(cancel),
        )
        .await?;
    let produced = job.successes().count();
    let state = job.state;
    for outcome in &job.outcomes {
        match outcome {
            Outcome::Success {
                produced_name,
                source_item_name,
                ..
            } => println!("ok     {} -> {}", source_item_name, produced_name),
            Outcome::Failure {
                source_item_name,
                reason,
                ..
            } => println!("failed {}: {}", source_item_name, reason),
        }
    }
    if let Err(e) = progress.await {
        debug!("Progress logger ended abnormally: {}", e);
    }

    if produced == 0 {
        bail!("No file was converted (batch {})", state);
    }

    if zip {
        if let Some(saved) = session.download_all().await? {
            println!("saved  {}", saved.location);
        }
    } else {
        save_each(&mut session, produced).await;
    }
    Ok(())
}

/// Saves every result on its own; one failed save doesn't stop the others.
async fn save_each(session: &mut Session, count: usize) {
    for index in 0..count {
        match session.download(index).await {
            Ok(saved) => println!("saved  {}", saved.location),
            Err(e) => warn!("Download {} of {} failed: {}", index + 1, count, e),
        }
    }
}

async fn log_progress(mut rx: mpsc::Receiver<BatchProgress>) {
    while let Some(event) = rx.recv().await {
        match event {
            BatchProgress::Started { batch_id, total } => {
                info!("Batch {} started with {} file(s)", batch_id, total)
            }
            BatchProgress::ItemStarted { index, total, name } => {
                info!("[{}/{}] Converting {}", index + 1, total, name)
            }
            BatchProgress::ItemFinished {
                processed,
                total,
                success,
            } => debug!("[{}/{}] done (success: {})", processed, total, success),
            BatchProgress::Finished {
                state,
                successes,
                failures,
            } => info!(
                "Batch finished: {} ({} succeeded, {} failed)",
                state, successes, failures
            ),
        }
    }
}

/// Ctrl-C stops the batch after the file currently being converted.
fn spawn_interrupt_handler(cancel: CancelHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current file");
            cancel.cancel();
        }
    });
}
