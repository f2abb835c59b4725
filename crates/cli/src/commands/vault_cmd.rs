//! `cplane vault` — direct administrative access to the credential
//! vault, bypassing the registry's per-connector grant model entirely.
//! Values are write-only from here on out: nothing in this module ever
//! prints a stored secret back out.

use crate::context::PlaneContext;
use std::path::PathBuf;

pub async fn store(
    config_path: PathBuf,
    vault_key: String,
    value: String,
    credential_type: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = PlaneContext::load(&config_path)?;
    ctx.vault.store(&vault_key, &value, &credential_type);
    println!("stored '{vault_key}'");
    Ok(())
}

pub async fn list(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = PlaneContext::load(&config_path)?;
    for key in ctx.vault.list_keys() {
        println!("  {key}");
    }
    Ok(())
}

pub async fn delete(config_path: PathBuf, vault_key: String) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = PlaneContext::load(&config_path)?;
    if ctx.vault.delete(&vault_key) {
        println!("deleted '{vault_key}'");
    } else {
        println!("'{vault_key}' was not present");
    }
    Ok(())
}

pub async fn describe(config_path: PathBuf, vault_key: String) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = PlaneContext::load(&config_path)?;
    match ctx.vault.describe(&vault_key) {
        Some(entry) => {
            println!("key:        {vault_key}");
            println!("type:       {}", entry.credential_type);
            println!("created_at: {}", entry.created_at);
            println!("updated_at: {}", entry.updated_at);
        }
        None => println!("'{vault_key}' was not found"),
    }
    Ok(())
}
