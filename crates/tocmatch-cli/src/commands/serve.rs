use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tiny_http::Server;
use tocmatch_etl::Config;
use tocmatch_search::{IndexHandle, LookupService};

use super::build::build_index;
use crate::server;

/// Serve lookups until the listener shuts down.
pub async fn run_serve(config: Config) -> Result<()> {
    let handle = Arc::new(IndexHandle::new());
    let service = LookupService::new(Arc::clone(&handle));

    let addr = config.listen_addr();
    let listener = Server::http(&addr)
        .map(Arc::new)
        .map_err(|e| anyhow::anyhow!("Failed to listen on {addr}: {e}"))?;
    log::info!("Listening on http://{addr}/ws/1/toc/");

    let builder = tokio::spawn(rebuild_loop(config.clone(), Arc::clone(&handle)));

    let workers = config.workers.max(1);
    log::debug!("Starting {workers} request workers");
    let default_threshold_ms = config.default_threshold_ms;
    let tasks: Vec<_> = (0..workers)
        .map(|_| {
            let listener = Arc::clone(&listener);
            let service = service.clone();
            tokio::task::spawn_blocking(move || {
                server::serve(&listener, &service, default_threshold_ms);
            })
        })
        .collect();

    for task in tasks {
        task.await.context("Server task failed")?;
    }

    builder.abort();
    Ok(())
}

/// Build the index, install it, and repeat every `rebuild_interval_secs`.
///
/// A failed build is logged; whatever index is installed keeps serving.
async fn rebuild_loop(config: Config, handle: Arc<IndexHandle>) {
    loop {
        let build_config = config.clone();
        match tokio::task::spawn_blocking(move || build_index(&build_config)).await {
            Ok(Ok(built)) => {
                log::info!(
                    "Index ready: {} tracklists indexed, {} dropped, built in {:.2?}",
                    built.stats.indexed,
                    built.stats.dropped(),
                    built.stats.elapsed
                );
                handle.install(built.index);
            }
            Ok(Err(e)) => log::error!("{e:#}"),
            Err(e) => log::error!("Index build task failed: {e}"),
        }

        let Some(secs) = config.rebuild_interval_secs else {
            break;
        };
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }
}
