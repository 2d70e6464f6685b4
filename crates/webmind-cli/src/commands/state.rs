//! State and theme commands - read persisted settings.

use webmind_runtime::{read_theme, PersistedModelState, RuntimeConfig};

use super::open_store;

pub(crate) async fn show() -> miette::Result<()> {
    let config = RuntimeConfig::from_env();
    let store = open_store(&config);

    let state = PersistedModelState::read(store.as_ref())
        .await
        .map_err(|e| miette::miette!("Failed to read state: {}", e))?;

    println!("State file: {}", store.path().display());
    println!(
        "Selected model: {}",
        state.current_model_id.as_deref().unwrap_or("(none)")
    );
    println!("Enabled:        {}", state.model_enabled);

    Ok(())
}

pub(crate) async fn theme() -> miette::Result<()> {
    let config = RuntimeConfig::from_env();
    let store = open_store(&config);

    let theme = read_theme(store.as_ref())
        .await
        .map_err(|e| miette::miette!("Failed to read theme: {}", e))?;
    println!("{}", theme);

    Ok(())
}

pub(crate) async fn toggle_theme() -> miette::Result<()> {
    let config = RuntimeConfig::from_env();
    let store = open_store(&config);

    let theme = webmind_runtime::toggle_theme(store.as_ref())
        .await
        .map_err(|e| miette::miette!("Failed to save theme: {}", e))?;
    println!("Theme set to {}", theme);

    Ok(())
}
