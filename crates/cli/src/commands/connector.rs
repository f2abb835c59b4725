//! `cplane connector` — read-only registry introspection.

use crate::context::PlaneContext;
use std::path::PathBuf;

pub async fn list(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = PlaneContext::load(&config_path)?;
    let active = ctx.registry.list_active();

    for id in ctx.registry.list_connectors() {
        let state = if active.contains(&id) { "active" } else { "registered" };
        println!("  {id:<12} {state}");
    }

    Ok(())
}

pub async fn status(config_path: PathBuf, connector_id: String) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = PlaneContext::load(&config_path)?;

    let manifest = ctx
        .registry
        .with_connector(&connector_id, |c| c.manifest().clone())?;
    let valid = ctx
        .registry
        .with_connector(&connector_id, |c| c.validate_credentials(&ctx.vault))?;

    println!("connector:    {}", manifest.id);
    println!("name:         {}", manifest.name);
    println!("version:      {}", manifest.version);
    println!("source:       {:?}", manifest.source);
    println!("domains:      {}", manifest.target_domains.join(", "));
    println!("credentials:");
    for spec in &manifest.required_credentials {
        let present = ctx.vault.exists(&spec.vault_key);
        println!(
            "  {:<20} required={:<5} present={}",
            spec.vault_key, spec.required, present
        );
    }
    println!("credentials valid: {valid}");

    Ok(())
}
