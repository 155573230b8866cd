//! CLI commands

pub mod import;
pub mod republish;
pub mod clean;

use console::style;
use debintake_core::{PublishOutcome, PublishReport};

/// One summary line for a publish or switch
pub(crate) fn print_publish(report: &PublishReport) {
    let action = match report.outcome {
        PublishOutcome::Switched => "Switched",
        PublishOutcome::Published => "Published",
        PublishOutcome::Recreated => "Republished",
    };
    println!(
        "{} {} {}/{} {}",
        style("✓").green().bold(),
        action,
        style(&report.prefix).cyan(),
        style(&report.distribution).cyan(),
        style(format!("({} snapshot(s))", report.snapshots.len())).dim()
    );
    if report.outcome == PublishOutcome::Recreated {
        println!(
            "  {} {}",
            style("ℹ").cyan(),
            style("a new component was added, the distribution was published again").dim()
        );
    }
}
