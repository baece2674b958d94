use crate::cli::Target;
use crate::docker::ports::docker_host;
use crate::docker::{ComposeOrchestrator, SystemRunner};
use crate::errors::{EnvError, Result};
use std::sync::Arc;

/// List host ports currently mapped to the exposed services
pub fn list(target: &Target, json: bool) -> Result<()> {
    let descriptor = target.descriptor()?;
    let orchestrator = ComposeOrchestrator::new(descriptor.clone(), Arc::new(SystemRunner));
    let host = docker_host();

    if json {
        let entries: Vec<serde_json::Value> = descriptor
            .exposures()
            .iter()
            .map(|exposure| {
                let mapped = orchestrator.service_port(&exposure.service, exposure.port).ok();
                serde_json::json!({
                    "service": exposure.service,
                    "port": exposure.port,
                    "host": host,
                    "mapped_port": mapped,
                })
            })
            .collect();
        let rendered = serde_json::to_string_pretty(&entries)
            .map_err(|e| EnvError::CommandFailed(format!("Failed to render JSON: {}", e)))?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("{:<15} {:<10} {:<25}", "SERVICE", "PORT", "ENDPOINT");
    println!("{}", "-".repeat(50));

    for exposure in descriptor.exposures() {
        let endpoint = match orchestrator.service_port(&exposure.service, exposure.port) {
            Ok(mapped) => format!("{}:{}", host, mapped),
            Err(_) => "not running".to_string(),
        };
        println!(
            "{:<15} {:<10} {:<25}",
            exposure.service, exposure.port, endpoint
        );
    }

    Ok(())
}
