//! Import command - publish the contents of a .changes file

use console::style;
use debintake_core::{IntakeBatch, IntakeSettings, Publisher};
use std::path::Path;

use crate::commands::print_publish;
use crate::error::Result;

pub async fn run(settings: IntakeSettings, changes: &Path) -> Result<()> {
    let batch = IntakeBatch::from_changes(changes)?;
    let publisher = Publisher::new(settings)?;

    println!(
        "{} {} {} {}",
        style("Importing").bold(),
        style(changes.display()).cyan(),
        style("→").dim(),
        style(format!("{}/{}", batch.channel, batch.distribution)).green()
    );
    println!(
        "  {} {}",
        style("Run:").dim(),
        style(publisher.run_id()).dim()
    );

    let report = publisher.import(&batch).await?;

    println!(
        "  {} {} file(s) into {}",
        style("Uploaded").bold(),
        batch.files.len(),
        report.upload.directories.join(", ")
    );
    for repository in &report.created_repositories {
        println!("  {} created {}", style("+").green(), repository);
    }
    if !report.failed_files.is_empty() {
        println!();
        println!("  {}", style("Files not included").bold().yellow());
        println!("  {}", style("──────────────────").dim());
        for file in &report.failed_files {
            println!("  {} {}", style("○").yellow(), file);
        }
    }

    println!();
    print_publish(&report.publish);
    Ok(())
}
