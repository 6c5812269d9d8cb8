//! Compare command implementation

use std::path::Path;

use archive_core::{ComparisonResult, compare_repositories};
use colored::Colorize;

use super::open_base;
use crate::error::Result;

/// Run the compare command
///
/// Indexes both directories and prints how OTHER differs from BASE.
pub async fn run_compare(base: &Path, other: &Path, json: bool) -> Result<()> {
    if json {
        let result = compare_repositories(&open_base(base)?, &open_base(other)?).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "{} Comparing {} with {}...",
        "=>".blue().bold(),
        base.display().to_string().cyan(),
        other.display().to_string().cyan()
    );

    let base = open_base(base)?;
    let other = open_base(other)?;
    let result = compare_repositories(&base, &other).await?;

    print_comparison(&result);
    Ok(())
}

/// Print a comparison result
pub fn print_comparison(result: &ComparisonResult) {
    if result.is_identical() {
        println!(
            "{} Repositories hold the same content at the same paths.",
            "OK".green().bold()
        );
        print_stats(result);
        return;
    }

    let base_groups = result.base_extra_groups();
    if !base_groups.is_empty() {
        println!();
        println!("{}", "Only in base:".bold());
        for (_, entries) in &base_groups {
            for entry in entries {
                println!(
                    "   {} {} {}",
                    "+".green(),
                    entry.path,
                    format_size(entry.size).dimmed()
                );
            }
        }
    }

    let other_groups = result.other_extra_groups();
    if !other_groups.is_empty() {
        println!();
        println!("{}", "Only in other:".bold());
        for (_, entries) in &other_groups {
            for entry in entries {
                println!(
                    "   {} {} {}",
                    "-".yellow(),
                    entry.path,
                    format_size(entry.size).dimmed()
                );
            }
        }
    }

    if !result.relocations.is_empty() {
        println!();
        println!("{}", "Relocated content:".bold());
        for relocation in &result.relocations {
            println!(
                "   {} {} {} {} {}",
                "~".cyan(),
                join_paths(&relocation.other_paths),
                "->".dimmed(),
                join_paths(&relocation.base_paths),
                short_checksum(&relocation.checksum).dimmed()
            );
        }
    }

    let conflicts: Vec<_> = result
        .new_content_after_move
        .iter()
        .chain(&result.new_content_to_overwrite)
        .collect();
    if !conflicts.is_empty() {
        println!();
        println!(
            "{} Paths holding different content on each side (never overwritten):",
            "CONFLICT".red().bold()
        );
        for path in conflicts {
            println!("   {} {}", "!".red(), path);
        }
    }

    print_stats(result);
}

fn print_stats(result: &ComparisonResult) {
    println!();
    println!(
        "{} base files, {} other files: {} matched, {} only in base, {} only in other, {} relocated",
        result.all_base_files.len(),
        result.all_other_files.len(),
        result.matched.len(),
        result.unmatched_base_extras.len(),
        result.unmatched_other_extras.len(),
        result.relocations.len()
    );
}

pub(crate) fn join_paths<T: std::fmt::Display>(paths: &[T]) -> String {
    if paths.is_empty() {
        return "(none)".to_string();
    }
    paths
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn short_checksum(checksum: &str) -> String {
    format!("[{}]", checksum.get(..12).unwrap_or(checksum))
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("({} B)", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("({:.1} {})", value, unit)
}
