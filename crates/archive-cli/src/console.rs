//! Terminal output while a sync job runs
//!
//! A single [`ProgressBar`] on stderr is shared by the progress display, the
//! observer and the prompter. Printing and prompting suspend the bar so the
//! lines do not tear.

use std::time::Duration;

use archive_core::sync::{JobProgress, ProgressSummary};
use archive_core::{ArchivePath, Error, SyncGroup, SyncObserver, SyncPrompter, TracingObserver};
use async_trait::async_trait;
use colored::Colorize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Progress bar following a job's progress channel
#[derive(Clone)]
pub struct ProgressDisplay {
    bar: ProgressBar,
}

impl ProgressDisplay {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "  {spinner:.cyan} Syncing [{bar:30.cyan/dim}] {pos}/{len} {wide_msg}",
        )
        .map(|style| style.progress_chars("━╸─").tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar }
    }

    /// Print a line above the bar.
    pub fn println(&self, line: impl AsRef<str>) {
        self.bar.suspend(|| println!("{}", line.as_ref()));
    }

    /// Keep the bar in step with `progress` until the returned task is aborted
    /// or the job goes away.
    pub fn follow(&self, mut progress: watch::Receiver<JobProgress>) -> JoinHandle<()> {
        let bar = self.bar.clone();
        tokio::spawn(async move {
            loop {
                render(&bar, &progress.borrow_and_update());
                if progress.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressDisplay {
    fn default() -> Self {
        Self::new()
    }
}

fn render(bar: &ProgressBar, progress: &JobProgress) {
    let done = progress.completed() + progress.failed();
    if bar.length() != Some(progress.total() as u64) {
        bar.set_length(progress.total() as u64);
    }
    bar.set_position(done as u64);

    let mut message = match &progress.in_flight {
        Some(copy) => format!("{} {:>3.0}%", copy.filename, copy.completion() * 100.0),
        None => String::new(),
    };
    if let Some(remaining) = estimate(&progress.summary()) {
        message.push_str(&format!(" (~{}s left)", remaining.as_secs()));
    }
    bar.set_message(message);
}

fn estimate(summary: &ProgressSummary) -> Option<Duration> {
    if summary.completion() >= 1.0 {
        return None;
    }
    summary.time_estimated()
}

/// Observer printing each outcome above the progress bar
///
/// Outcomes are also forwarded to the log.
pub struct ConsoleObserver {
    display: ProgressDisplay,
    log: TracingObserver,
}

impl ConsoleObserver {
    pub fn new(display: ProgressDisplay) -> Self {
        Self {
            display,
            log: TracingObserver,
        }
    }
}

impl SyncObserver for ConsoleObserver {
    fn on_file_stored(&self, path: &ArchivePath) {
        self.log.on_file_stored(path);
        self.display.println(format!("   {} {}", "+".green(), path));
    }

    fn on_file_store_failed(&self, path: &ArchivePath, error: &Error) {
        self.log.on_file_store_failed(path, error);
        self.display
            .println(format!("   {} {}: {}", "x".red().bold(), path, error));
    }

    fn on_file_moved(&self, from: &ArchivePath, to: &ArchivePath) {
        self.log.on_file_moved(from, to);
        self.display
            .println(format!("   {} {} {} {}", "~".cyan(), from, "->".dimmed(), to));
    }

    fn on_file_move_failed(&self, from: &ArchivePath, to: &ArchivePath, error: &Error) {
        self.log.on_file_move_failed(from, to, error);
        self.display.println(format!(
            "   {} {} -> {}: {}",
            "x".red().bold(),
            from,
            to,
            error
        ));
    }
}

/// Asks on the terminal before each group
pub struct TerminalPrompter {
    display: ProgressDisplay,
}

impl TerminalPrompter {
    pub fn new(display: ProgressDisplay) -> Self {
        Self { display }
    }
}

#[async_trait]
impl SyncPrompter for TerminalPrompter {
    async fn confirm(&self, group: &SyncGroup) -> bool {
        let prompt = format!("Do you want to sync {}?", group.action_phrase());
        let listing: Vec<String> = group
            .operations()
            .iter()
            .map(|op| format!("   {} {}", "*".dimmed(), op))
            .collect();
        let bar = self.display.bar.clone();

        let answer = tokio::task::spawn_blocking(move || {
            bar.suspend(|| {
                println!();
                for line in &listing {
                    println!("{}", line);
                }
                Confirm::new().with_prompt(prompt).default(true).interact()
            })
        })
        .await;

        match answer {
            Ok(Ok(confirmed)) => confirmed,
            Ok(Err(e)) => {
                tracing::warn!("Confirmation prompt failed: {}", e);
                false
            }
            Err(e) => {
                tracing::warn!("Confirmation prompt task failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archive_core::sync::{CopyOperationProgress, GroupKind, GroupProgress};

    #[test]
    fn render_tracks_completed_and_failed() {
        let bar = ProgressBar::hidden();
        let mut group = GroupProgress::new(GroupKind::NewFiles, 4);
        group.completed = 2;
        group.failed = 1;
        let progress = JobProgress {
            groups: vec![group],
            in_flight: Some(CopyOperationProgress::started(
                ArchivePath::new("a.txt").unwrap(),
                10,
            )),
        };

        render(&bar, &progress);

        assert_eq!(bar.length(), Some(4));
        assert_eq!(bar.position(), 3);
        assert!(bar.message().starts_with("a.txt"));
    }

    #[test]
    fn finished_progress_has_no_estimate() {
        let mut group = GroupProgress::new(GroupKind::Relocations, 1);
        group.completed = 1;
        group.time_estimated = Some(Duration::from_secs(5));
        let progress = JobProgress {
            groups: vec![group],
            in_flight: None,
        };

        assert_eq!(estimate(&progress.summary()), None);
    }
}
