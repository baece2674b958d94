use crate::cli::Target;
use crate::docker::{ComposeOrchestrator, SystemRunner};
use crate::environment::RunningEnvironment;
use crate::errors::Result;
use colored::Colorize;
use std::sync::Arc;

fn orchestrator(target: &Target) -> Result<ComposeOrchestrator> {
    let descriptor = target.descriptor()?;
    Ok(ComposeOrchestrator::new(descriptor, Arc::new(SystemRunner)))
}

/// Start the environment, wait for every exposed port, and leave it running
pub fn up(target: &Target) -> Result<()> {
    let descriptor = target.descriptor()?;
    let project = descriptor.project_name().to_string();

    println!("Starting environment '{}'...", project);
    let environment = RunningEnvironment::start(descriptor)?;
    let host = environment.host().to_string();
    let ports = environment.detach();

    println!("{} Environment '{}' is up", "✓".green().bold(), project);
    println!();
    println!("{:<15} {:<10} {:<25}", "SERVICE", "PORT", "ENDPOINT");
    println!("{}", "-".repeat(50));
    for (exposure, mapped) in ports {
        println!(
            "{:<15} {:<10} {:<25}",
            exposure.service,
            exposure.port,
            format!("{}:{}", host, mapped)
        );
    }

    Ok(())
}

/// Stop and remove the environment's containers
pub fn down(target: &Target) -> Result<()> {
    let orchestrator = orchestrator(target)?;
    let project = orchestrator.descriptor().project_name().to_string();

    println!("Stopping environment '{}'...", project);
    orchestrator.down()?;
    println!("{} Environment '{}' stopped", "✓".green().bold(), project);

    Ok(())
}

/// Show whether the environment's containers are running
pub fn ps(target: &Target) -> Result<()> {
    let orchestrator = orchestrator(target)?;
    let project = orchestrator.descriptor().project_name().to_string();
    let count = orchestrator.running_container_count();

    let status = if count > 0 {
        "Running".green()
    } else {
        "Stopped".red()
    };

    println!("{:<20} {:<15} {:<10}", "PROJECT", "STATUS", "CONTAINERS");
    println!("{}", "-".repeat(45));
    println!("{:<20} {:<15} {:<10}", project, status, count);

    Ok(())
}

/// Print container logs, optionally for one service
pub fn logs(target: &Target, service: Option<String>, follow: bool) -> Result<()> {
    let orchestrator = orchestrator(target)?;

    if follow {
        println!("(Press Ctrl+C to exit)\n");
    }
    orchestrator.logs(service.as_deref(), follow)
}
