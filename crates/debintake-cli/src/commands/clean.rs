//! Clean command - drop old package versions and unpublished snapshots

use console::style;
use debintake_core::{Cleaner, IntakeSettings};

use crate::error::{CliError, Result};

pub async fn run(settings: IntakeSettings, keep: Option<usize>) -> Result<()> {
    let keep = keep.unwrap_or(settings.keep_versions);
    if keep == 0 {
        return Err(CliError::validation_with_help(
            "--keep must be at least 1",
            "Removing every version would empty the repositories",
        ));
    }

    let report = Cleaner::new(settings)?.run(keep).await?;

    if report.removed_packages.is_empty() {
        println!("{} no old package versions", style("✓").green().bold());
    }
    for (repository, refs) in &report.removed_packages {
        println!(
            "{} {} {}",
            style("✓").green().bold(),
            style(repository).cyan(),
            style(format!("removed {} package(s)", refs.len())).dim()
        );
        for package in refs {
            println!("  {} {}", style("-").red(), package);
        }
    }

    println!(
        "{} removed {} snapshot(s)",
        style("✓").green().bold(),
        report.removed_snapshots.len()
    );
    for snapshot in &report.skipped_snapshots {
        println!("  {} {} {}", style("○").yellow(), snapshot, style("(published)").dim());
    }
    if report.db_cleanup {
        println!("{} database cleanup finished", style("✓").green().bold());
    }
    Ok(())
}
