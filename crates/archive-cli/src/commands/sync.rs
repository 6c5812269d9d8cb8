//! Sync command implementation
//!
//! Compares BASE with OTHER, plans under the chosen relocation mode and runs
//! the plan as a guarded job. Policy blocks are reported before anything is
//! written.

use std::sync::Arc;

use archive_core::sync::BlockReason;
use archive_core::{
    AutoConfirm, BlockedRelocation, FilesRepository, RepositoryPair, Settings, SyncJob, SyncPlan,
    SyncPrompter, UniqueJobGuard, compare_repositories, discover,
};
use colored::Colorize;

use super::compare::{join_paths, print_comparison};
use super::{open_base, open_destination};
use crate::cli::SyncArgs;
use crate::console::{ConsoleObserver, ProgressDisplay, TerminalPrompter};
use crate::error::{CliError, Result};

/// Run the sync command
pub async fn run_sync(args: &SyncArgs, settings: &Settings) -> Result<()> {
    if args.json {
        return print_plan_json(args).await;
    }

    println!(
        "{} Syncing {} into {}...",
        "=>".blue().bold(),
        args.base.display().to_string().cyan(),
        args.other.display().to_string().cyan()
    );

    let base = Arc::new(open_base(&args.base)?);
    let other = Arc::new(open_destination(&args.other)?);
    let result = compare_repositories(&*base, &*other).await?;
    if settings.sync.show_comparison {
        print_comparison(&result);
    }

    let mode = args.mode();
    tracing::debug!("Relocation mode: {}", mode);
    let plan = discover(&result, mode)?;

    if plan.has_ignored() {
        let ignored = plan.ignored();
        print_blocked(&ignored);
        return Err(CliError::blocked(policy_message(&ignored)));
    }

    if plan.is_no_op() {
        println!(
            "{} No changes to {}.",
            "OK".green().bold(),
            args.other.display()
        );
        return Ok(());
    }

    if args.dry_run {
        print_plan(&plan);
        println!();
        println!("{} Dry run, nothing was applied.", "=>".blue().bold());
        return Ok(());
    }

    let confirm = settings.sync.confirm && !args.yes;
    execute(&plan, base, other, confirm).await
}

/// Print the plan as JSON, blocked relocations included.
///
/// Only reads OTHER, so no metadata is created there.
async fn print_plan_json(args: &SyncArgs) -> Result<()> {
    let base = open_base(&args.base)?;
    let other = open_base(&args.other)?;
    let result = compare_repositories(&base, &other).await?;
    let plan = discover(&result, args.mode())?;
    println!("{}", serde_json::to_string_pretty(&plan)?);

    if plan.has_ignored() {
        return Err(CliError::blocked(policy_message(&plan.ignored())));
    }
    Ok(())
}

async fn execute(
    plan: &SyncPlan,
    base: Arc<FilesRepository>,
    other: Arc<FilesRepository>,
    confirm: bool,
) -> Result<()> {
    let display = ProgressDisplay::new();
    let prompter: Arc<dyn SyncPrompter> = if confirm {
        Arc::new(TerminalPrompter::new(display.clone()))
    } else {
        Arc::new(AutoConfirm)
    };
    let observer = Arc::new(ConsoleObserver::new(display.clone()));

    let key = RepositoryPair::new(&*base, &*other);
    let job = Arc::new(plan.create_job(base, other, prompter, observer));
    let guard: UniqueJobGuard<RepositoryPair, SyncJob> = UniqueJobGuard::new();

    let follower = display.follow(job.progress());
    let handle = guard.launch(key.clone(), Arc::clone(&job))?;

    let interrupt = {
        let guard = guard.clone();
        let key = key.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling sync of {}", key);
                guard.cancel(&key);
            }
        })
    };

    let joined = handle.await;
    interrupt.abort();
    follower.abort();
    display.finish();
    joined.map_err(archive_core::Error::from)?;

    print_summary(&job);
    let outcome = job.state().borrow().error().cloned();
    match outcome {
        None => {
            println!("{} Sync complete.", "OK".green().bold());
            Ok(())
        }
        Some(error) => Err(error.into()),
    }
}

fn print_summary(job: &SyncJob) {
    let progress = job.progress().borrow().clone();
    let parts: Vec<String> = progress
        .groups
        .iter()
        .filter(|group| group.total > 0)
        .map(|group| {
            if group.failed > 0 {
                format!("{} ({} failed)", group.summary_text(), group.failed)
            } else {
                group.summary_text()
            }
        })
        .collect();
    if !parts.is_empty() {
        println!();
        println!("{} {}", "=>".blue().bold(), parts.join(", "));
    }
}

fn print_plan(plan: &SyncPlan) {
    for group in &plan.groups {
        let operations = group.operations();
        if operations.is_empty() {
            continue;
        }
        println!();
        println!("{} ({}):", group.kind().to_string().bold(), operations.len());
        for operation in operations {
            println!("   {} {}", "*".dimmed(), operation);
        }
    }
}

fn print_blocked(ignored: &[&BlockedRelocation]) {
    println!();
    println!(
        "{} {} relocation(s) blocked by policy:",
        "BLOCKED".yellow().bold(),
        ignored.len()
    );
    for blocked in ignored {
        println!(
            "   {} {} {} {} {}",
            "!".yellow(),
            join_paths(&blocked.relocation.other_paths),
            "->".dimmed(),
            join_paths(&blocked.relocation.base_paths),
            describe_reason(blocked.reason).dimmed()
        );
    }
}

fn describe_reason(reason: BlockReason) -> &'static str {
    match reason {
        BlockReason::RelocationsDisabled => "(relocations disabled)",
        BlockReason::DuplicateIncreaseNotAllowed => "(adds copies)",
        BlockReason::DuplicateReductionNotAllowed => "(drops copies)",
    }
}

/// Message naming the flag that would let the blocked relocations through
fn policy_message(ignored: &[&BlockedRelocation]) -> String {
    let has = |reason: BlockReason| ignored.iter().any(|b| b.reason == reason);

    if has(BlockReason::RelocationsDisabled) {
        return "Relocations disabled but present. Enable relocations with --resolve-moves, \
                or switch to --additive-duplicating mode"
            .to_string();
    }

    let mut messages = Vec::new();
    if has(BlockReason::DuplicateIncreaseNotAllowed) {
        messages.push(
            "Duplicate increase is not enabled. Enable it with --allow-duplicate-increase",
        );
    }
    if has(BlockReason::DuplicateReductionNotAllowed) {
        messages.push(
            "Duplicate decrease is not enabled. Enable it with --allow-duplicate-reduction",
        );
    }
    messages.join(". ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use archive_core::{ArchivePath, RelocationCandidate};

    fn blocked(reason: BlockReason) -> BlockedRelocation {
        BlockedRelocation {
            relocation: RelocationCandidate {
                checksum: "abc".into(),
                size: 1,
                base_paths: vec![ArchivePath::new("a").unwrap()],
                other_paths: vec![ArchivePath::new("b").unwrap()],
            },
            reason,
        }
    }

    #[test]
    fn disabled_relocations_point_at_resolve_moves() {
        let b = blocked(BlockReason::RelocationsDisabled);
        let message = policy_message(&[&b]);
        assert!(message.starts_with("Relocations disabled but present."));
        assert!(message.contains("--resolve-moves"));
        assert!(message.contains("--additive-duplicating"));
    }

    #[test]
    fn duplicate_reasons_are_combined() {
        let inc = blocked(BlockReason::DuplicateIncreaseNotAllowed);
        let red = blocked(BlockReason::DuplicateReductionNotAllowed);

        assert_eq!(
            policy_message(&[&inc]),
            "Duplicate increase is not enabled. Enable it with --allow-duplicate-increase"
        );
        let both = policy_message(&[&red, &inc]);
        assert!(both.contains("--allow-duplicate-increase"));
        assert!(both.contains("--allow-duplicate-reduction"));
    }
}
