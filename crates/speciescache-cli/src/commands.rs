use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use speciescache_core::cache::{spawn_message_loop, AssetCacheController, DiskCacheStorage};
use speciescache_core::sync::{local_status, SyncOutcome, SyncPhase, SyncProgress};
use speciescache_core::{Config, JsonFileStore, ReqwestTransport, SyncEngine};

fn open_store(config: &Config) -> Result<Arc<JsonFileStore>> {
    let dir = config.store_dir()?;
    let store = JsonFileStore::open(&dir)
        .with_context(|| format!("Failed to open store at {}", dir.display()))?;
    Ok(Arc::new(store))
}

fn open_controller(config: &Config, http: Arc<ReqwestTransport>) -> Result<AssetCacheController> {
    let dir = config.asset_cache_dir()?;
    let storage = DiskCacheStorage::open_root(&dir)
        .with_context(|| format!("Failed to open asset cache at {}", dir.display()))?;
    let controller = AssetCacheController::new(config.controller_config(), Arc::new(storage), http)?;
    Ok(controller)
}

fn print_progress(progress: &SyncProgress) {
    match (progress.phase, progress.current, progress.total) {
        (SyncPhase::Media, Some(current), Some(total)) => eprint!("\rmedia {}/{}", current, total),
        (SyncPhase::Done, _, _) => eprintln!(),
        _ => {
            if let Some(ref message) = progress.message {
                eprintln!("{}", message);
            }
        }
    }
}

pub async fn sync(config: &Config, force: bool, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let http = Arc::new(ReqwestTransport::new()?);
    let controller = Arc::new(open_controller(config, http.clone())?);
    let (handle, warm_task) = spawn_message_loop(controller);

    let mut options = config.sync_options(force);
    if !json {
        options = options.with_progress(print_progress);
    }

    let engine = SyncEngine::new(store, http).with_warmer(Arc::new(handle));
    let report = engine.sync(&options).await.context("Sync failed")?;

    // Let queued cache warm-ups finish before exiting.
    drop(engine);
    if let Err(e) = warm_task.await {
        debug!(error = %e, "Controller message loop ended abnormally");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    match report.outcome {
        SyncOutcome::UpToDate => println!("Up to date (version {})", report.remote_version),
        SyncOutcome::Applied => {
            println!("Synced to version {}", report.remote_version);
            println!(
                "  species: {} en, {} tet",
                report.records_en, report.records_tet
            );
            println!(
                "  media:   {} total, {} downloaded, {} already cached, {} failed",
                report.media_total, report.downloaded, report.skipped, report.failed
            );
        }
    }
    Ok(())
}

pub async fn status(config: &Config, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let status = local_status(store.as_ref()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }
    println!("Bundle version: {}", status.version_display());
    println!("Species:        {} en, {} tet", status.species_en, status.species_tet);
    println!("Media:          {} cached, {} failed", status.media_cached, status.media_failed);
    Ok(())
}

/// Install the application shell into the asset cache and activate it.
pub async fn precache(config: &Config) -> Result<()> {
    let http = Arc::new(ReqwestTransport::new()?);
    let controller = open_controller(config, http)?;

    let installed = controller.install().await?;
    let activated = controller.activate().await?;

    println!(
        "Cached {} assets into {} ({} failed)",
        installed.cached,
        controller.cache_name(),
        installed.failed
    );
    for name in activated.deleted {
        println!("  removed old cache {}", name);
    }
    Ok(())
}

/// Print the effective configuration, optionally writing it to the config
/// file so it can be edited.
pub fn config(config: &Config, save: bool) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    if save {
        config.save()?;
        eprintln!("Saved to {}", Config::config_path()?.display());
    }
    Ok(())
}
