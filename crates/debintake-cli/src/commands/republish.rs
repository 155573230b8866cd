//! Republish command - switch every channel to fresh snapshots

use console::style;
use debintake_core::{IntakeSettings, Publisher};

use crate::commands::print_publish;
use crate::error::Result;

pub async fn run(settings: IntakeSettings) -> Result<()> {
    let publisher = Publisher::new(settings)?;
    let reports = publisher.republish_all().await?;

    if reports.is_empty() {
        println!("{}", style("No channel repositories found").yellow());
        return Ok(());
    }
    for report in &reports {
        print_publish(report);
    }
    Ok(())
}
