//! Serve command - run the background service over stdin/stdout.
//!
//! Each stdin line is one JSON request. Responses and broadcast events are
//! written to stdout as JSON lines.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use webmind_background::{BackgroundService, Event, Response};
use webmind_runtime::RuntimeConfig;

use super::detect::{host_estimator, DetectFlags};
use super::open_manager;

fn emit_line<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!("Failed to serialize output: {}", e),
    }
}

pub(crate) async fn run() -> miette::Result<()> {
    let manager = open_manager(RuntimeConfig::from_env());
    let capabilities = host_estimator(DetectFlags::default(), manager.registry().clone())
        .estimate()
        .await;

    let service = Arc::new(BackgroundService::new(Arc::clone(&manager), capabilities));

    let mut events = service.listen();
    let forwarder = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => emit_line::<Event>(&event),
                Err(RecvError::Lagged(skipped)) => warn!("Dropped {} events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    service.restore().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = Vec::new();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| miette::miette!("Failed to read stdin: {}", e))?
    {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        // Requests run concurrently so a long load does not block the rest.
        let service = Arc::clone(&service);
        pending.push(tokio::spawn(async move {
            if let Some(response) = service.handle_json(&line).await {
                emit_line::<Response>(&response);
            }
        }));
    }

    debug!("stdin closed, waiting for {} requests", pending.len());
    for task in pending {
        if let Err(e) = task.await {
            warn!("Request task failed: {}", e);
        }
    }

    manager.shutdown().await;

    // Closing the relay lets the forwarder flush what is buffered and stop.
    drop(service);
    if let Err(e) = forwarder.await {
        warn!("Event forwarder failed: {}", e);
    }
    Ok(())
}
