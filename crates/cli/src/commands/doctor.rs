//! `cplane doctor` — diagnose configuration and pipeline health.

use cplane_config::{CatalogConfig, GovernanceConfig, ServiceConfig, VaultConfig};
use std::path::PathBuf;

pub async fn run(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("cplane doctor — diagnostics");
    println!("===========================\n");

    let mut issues = 0;

    let service = match ServiceConfig::load_from(&config_path) {
        Ok(service) => {
            println!("  [ok]   service config loads ({})", config_path.display());
            service
        }
        Err(e) => {
            println!("  [fail] service config: {e}");
            issues += 1;
            ServiceConfig::default()
        }
    };

    match GovernanceConfig::load_from(&service.config.governance_path) {
        Ok(_) => println!("  [ok]   governance config parses ({})", service.config.governance_path.display()),
        Err(e) => {
            println!("  [fail] governance config: {e}");
            issues += 1;
        }
    }

    let catalog = match CatalogConfig::load_from(&service.config.catalog_path) {
        Ok(catalog) => {
            println!("  [ok]   catalog config parses ({})", service.config.catalog_path.display());
            Some(catalog)
        }
        Err(e) => {
            println!("  [fail] catalog config: {e}");
            issues += 1;
            None
        }
    };

    if let Some(catalog) = &catalog {
        if catalog.settings.connectors_enabled {
            println!("  [ok]   connectors_enabled is true");
        } else {
            println!("  [warn] connectors_enabled is false — registry will refuse registrations");
            issues += 1;
        }
    }

    match VaultConfig::load_from(&service.config.vault_config_path) {
        Ok(vault_config) => {
            println!("  [ok]   vault config parses ({})", service.config.vault_config_path.display());
            match std::env::var(&vault_config.encryption.key_env_var) {
                Ok(v) if !v.is_empty() => println!("  [ok]   vault encryption key set (${})", vault_config.encryption.key_env_var),
                _ => {
                    println!(
                        "  [warn] vault encryption key not set (${}) — an ephemeral key will be used and credentials will not survive a restart",
                        vault_config.encryption.key_env_var
                    );
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  [fail] vault config: {e}");
            issues += 1;
        }
    }

    if service.gateway.require_bearer_auth && service.gateway.bearer_token_seed_path.is_none() {
        println!("  [warn] require_bearer_auth is true with no bearer_token_seed_path — a new token is generated and logged on every `serve` start");
    }

    println!();
    if issues == 0 {
        println!("  all checks passed");
    } else {
        println!("  {issues} issue(s) found. see above for details.");
    }

    Ok(())
}
