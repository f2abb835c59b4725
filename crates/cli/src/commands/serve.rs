//! `cplane serve` — start the credential-management HTTP gateway.

use crate::context::PlaneContext;
use std::path::PathBuf;

pub async fn run(
    config_path: PathBuf,
    port_override: Option<u16>,
    host_override: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = PlaneContext::load(&config_path)?;
    let mut gateway_config = ctx.service.gateway.clone();

    if let Some(port) = port_override {
        gateway_config.port = port;
    }
    if let Some(host) = host_override {
        gateway_config.host = host;
    }

    println!("Governed Connector Plane — gateway");
    println!("  listening:   {}:{}", gateway_config.host, gateway_config.port);
    println!("  bearer auth: {}", gateway_config.require_bearer_auth);
    println!("  connectors:  {}", ctx.registry.list_connectors().join(", "));

    cplane_gateway::serve(&gateway_config, ctx.registry, ctx.vault).await?;

    Ok(())
}
