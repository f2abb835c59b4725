//! `cplane credential` — local equivalents of the gateway's four
//! credential endpoints, operating on the vault/registry directly
//! instead of over HTTP.

use crate::context::PlaneContext;
use std::path::PathBuf;

pub async fn store(
    config_path: PathBuf,
    connector_id: String,
    vault_key: String,
    value: String,
    credential_type: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = PlaneContext::load(&config_path)?;
    let manifest = ctx
        .registry
        .with_connector(&connector_id, |c| c.manifest().clone())?;

    let declared = manifest
        .required_credentials
        .iter()
        .any(|spec| spec.vault_key == vault_key);
    if !declared {
        return Err(format!(
            "vault key '{vault_key}' is not declared by connector '{connector_id}'"
        )
        .into());
    }

    ctx.vault.store(&vault_key, &value, &credential_type);
    ctx.vault.grant_connector_access(&connector_id, &manifest);
    println!("stored '{vault_key}' for connector '{connector_id}'");

    Ok(())
}

pub async fn status(config_path: PathBuf, connector_id: String) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = PlaneContext::load(&config_path)?;
    let manifest = ctx
        .registry
        .with_connector(&connector_id, |c| c.manifest().clone())?;

    for spec in &manifest.required_credentials {
        println!(
            "{:<20} type={:<12} required={:<5} present={}",
            spec.vault_key,
            spec.credential_type,
            spec.required,
            ctx.vault.exists(&spec.vault_key)
        );
    }

    Ok(())
}

pub async fn delete(config_path: PathBuf, connector_id: String, vault_key: String) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = PlaneContext::load(&config_path)?;
    // Confirms the connector exists before mutating the vault on its behalf.
    ctx.registry.with_connector(&connector_id, |c| c.manifest().clone())?;

    let deleted = ctx.vault.delete(&vault_key);
    if deleted {
        ctx.vault.revoke_grant(&connector_id, &vault_key);
        println!("deleted '{vault_key}'");
    } else {
        println!("'{vault_key}' was not present");
    }

    Ok(())
}

pub async fn validate(config_path: PathBuf, connector_id: String) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = PlaneContext::load(&config_path)?;
    let manifest = ctx
        .registry
        .with_connector(&connector_id, |c| c.manifest().clone())?;

    let missing: Vec<&str> = manifest
        .required_credentials
        .iter()
        .filter(|spec| spec.required && !ctx.vault.exists(&spec.vault_key))
        .map(|spec| spec.vault_key.as_str())
        .collect();

    let valid = ctx
        .registry
        .with_connector(&connector_id, |c| c.validate_credentials(&ctx.vault))?;

    println!("valid: {valid}");
    if !missing.is_empty() {
        println!("missing: {}", missing.join(", "));
    }

    Ok(())
}
