use crate::cli::Target;
use crate::docker::ComposeMode;
use crate::errors::Result;
use colored::Colorize;

/// Check the compose file against the declared exposures without starting anything
pub fn run(target: &Target) -> Result<()> {
    let descriptor = target.descriptor()?;

    println!(
        "{} {}",
        "✓".green().bold(),
        descriptor.compose_file().display().to_string().cyan()
    );
    println!("  {:<14} {}", "Project:".bold(), descriptor.project_name());

    let mode = match descriptor.compose_mode() {
        ComposeMode::Local(variant) => format!("local ({:?})", variant),
        ComposeMode::Containerized { image } => format!("containerized ({})", image),
    };
    println!("  {:<14} {}", "Compose:".bold(), mode);
    println!("  {:<14} {}", "Services:".bold(), descriptor.services().join(", "));

    println!();
    println!("{:<15} {:<10}", "SERVICE", "PORT");
    println!("{}", "-".repeat(25));
    for exposure in descriptor.exposures() {
        println!("{:<15} {:<10}", exposure.service, exposure.port);
    }

    Ok(())
}
