//! External tool check.

use console::style;

use crate::extraction::tools::{check_tools, tool_hint};

/// Report whether the extraction tools are on PATH.
pub fn cmd_tools() -> anyhow::Result<()> {
    println!("\n{}", style("Extraction Tool Status").bold());
    println!("{}", "-".repeat(50));

    let mut missing = Vec::new();
    for (tool, available) in check_tools() {
        let status = if available {
            style("✓ found").green()
        } else {
            missing.push(tool.clone());
            style("✗ not found").red()
        };
        println!("  {:<15} {}", tool, status);
    }

    if missing.is_empty() {
        println!("\n{} All tools available", style("✓").green());
    } else {
        println!("\n{}", style("Missing tools:").yellow());
        for tool in &missing {
            println!("  {}", style(tool_hint(tool)).dim());
        }
        println!("\nDirect extraction still works; scanned permits need the missing tools.");
    }

    Ok(())
}
