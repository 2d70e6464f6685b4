//! Lifecycle commands - load, unload, toggle and chat against the engine
//! server.

use webmind_runtime::{
    LifecycleCallbacks, LifecycleManager, PersistedModelState, RestoreOutcome, RuntimeConfig,
};

use super::{open_manager, open_store};

fn manager_with_progress() -> std::sync::Arc<LifecycleManager> {
    let manager = open_manager(RuntimeConfig::from_env());
    manager.set_observers(
        LifecycleCallbacks::new()
            .on_progress(|percent, message| println!("  [{:>3.0}%] {}", percent, message)),
    );
    manager
}

pub(crate) async fn load(id: &str) -> miette::Result<()> {
    let manager = manager_with_progress();

    println!("Loading model: {}", id);
    manager
        .load(id)
        .await
        .map_err(|e| miette::miette!("{}", e))?;
    println!("Model '{}' loaded and enabled.", id);

    manager.shutdown().await;
    Ok(())
}

pub(crate) async fn unload() -> miette::Result<()> {
    let config = RuntimeConfig::from_env();
    let store = open_store(&config);

    // Nothing stays resident between invocations; clearing the selection
    // is what keeps the next start from restoring it.
    PersistedModelState::default()
        .write(store.as_ref())
        .await
        .map_err(|e| miette::miette!("Failed to unload model: {}", e))?;
    println!("Model unloaded.");

    Ok(())
}

pub(crate) async fn toggle() -> miette::Result<()> {
    let manager = manager_with_progress();

    if let RestoreOutcome::Failed(e) = manager.restore().await {
        println!("Could not restore the saved model: {}", e);
    }

    let enabled = manager
        .toggle_enabled()
        .await
        .map_err(|e| miette::miette!("{}", e))?;
    println!("Model {}.", if enabled { "enabled" } else { "disabled" });

    manager.shutdown().await;
    Ok(())
}

pub(crate) async fn chat(message: &str) -> miette::Result<()> {
    let manager = open_manager(RuntimeConfig::from_env());

    if let RestoreOutcome::Failed(e) = manager.restore().await {
        return Err(miette::miette!("Could not load the saved model: {}", e));
    }

    let reply = manager
        .converse(message)
        .await
        .map_err(|e| miette::miette!("{}", e))?;
    println!("{}", reply);

    manager.shutdown().await;
    Ok(())
}
