//! Models command - list the model catalog.

use webmind_models::ModelRegistry;

pub(crate) fn run(json: bool) -> miette::Result<()> {
    let registry = ModelRegistry::builtin();

    if json {
        let output = serde_json::to_string_pretty(registry.all())
            .map_err(|e| miette::miette!("Failed to serialize models: {}", e))?;
        println!("{}", output);
        return Ok(());
    }

    println!("Available models:");
    for profile in registry.all() {
        println!(
            "  {:<18} {:<28} {:>7}  needs {:.1} GB  [{}]",
            profile.id,
            profile.display_name,
            profile.size_on_disk,
            profile.memory_required_gb,
            profile.tier
        );
        println!("  {:<18} {}", "", profile.description);
    }

    Ok(())
}
