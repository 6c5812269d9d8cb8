//! CLI argument parsing using clap derive

use std::path::{Path, PathBuf};

use archive_core::RelocationSyncMode;
use clap::{Args, Parser, Subcommand};

/// Archive Sync - Compare and synchronize content-addressed archives
#[derive(Parser, Debug)]
#[command(name = "archive")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file (TOML or JSON)
    #[arg(long, global = true, env = "ARCHIVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Show how OTHER differs from BASE by content
    Compare {
        /// Source repository directory
        base: PathBuf,

        /// Destination repository directory
        other: PathBuf,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Bring OTHER in line with BASE
    ///
    /// Files are never deleted from OTHER. Relocated content is only moved
    /// when --resolve-moves is given.
    ///
    /// Examples:
    ///   archive sync ./master ./backup                      # new files only
    ///   archive sync ./master ./backup --resolve-moves      # also apply renames
    ///   archive sync ./master ./backup --additive-duplicating --yes
    Sync(SyncArgs),
}

impl Commands {
    /// Base repository directory of the command
    pub fn base(&self) -> &Path {
        match self {
            Commands::Compare { base, .. } => base,
            Commands::Sync(args) => &args.base,
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SyncArgs {
    /// Source repository directory
    pub base: PathBuf,

    /// Destination repository directory
    pub other: PathBuf,

    /// Apply relocations as moves inside OTHER
    #[arg(long)]
    pub resolve_moves: bool,

    /// Allow relocations that add copies of the same content
    #[arg(long, requires = "resolve_moves")]
    pub allow_duplicate_increase: bool,

    /// Allow relocations where OTHER keeps more copies than BASE
    #[arg(long, requires = "resolve_moves")]
    pub allow_duplicate_reduction: bool,

    /// Copy relocated content to its new paths instead of moving it
    #[arg(long, conflicts_with = "resolve_moves")]
    pub additive_duplicating: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Print the plan without applying it
    #[arg(long)]
    pub dry_run: bool,

    /// Print the dry-run plan as JSON
    #[arg(long, requires = "dry_run")]
    pub json: bool,
}

impl SyncArgs {
    pub fn mode(&self) -> RelocationSyncMode {
        if self.additive_duplicating {
            RelocationSyncMode::AdditiveDuplicating
        } else if self.resolve_moves {
            RelocationSyncMode::Move {
                allow_duplicate_increase: self.allow_duplicate_increase,
                allow_duplicate_reduction: self.allow_duplicate_reduction,
            }
        } else {
            RelocationSyncMode::Disabled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    fn sync_args(args: &[&str]) -> SyncArgs {
        match parse(args).command {
            Some(Commands::Sync(args)) => args,
            other => panic!("Expected sync command, got {:?}", other),
        }
    }

    #[test]
    fn compare_takes_two_paths() {
        let cli = parse(&["archive", "compare", "a", "b"]);
        assert_eq!(
            cli.command,
            Some(Commands::Compare {
                base: PathBuf::from("a"),
                other: PathBuf::from("b"),
                json: false,
            })
        );
    }

    #[test]
    fn sync_defaults_to_disabled_relocations() {
        let args = sync_args(&["archive", "sync", "a", "b"]);
        assert_eq!(args.mode(), RelocationSyncMode::Disabled);
        assert!(!args.yes);
        assert!(!args.dry_run);
    }

    #[test]
    fn resolve_moves_is_strict_by_default() {
        let args = sync_args(&["archive", "sync", "a", "b", "--resolve-moves"]);
        assert_eq!(args.mode(), RelocationSyncMode::strict_move());
    }

    #[test]
    fn duplicate_flags_extend_move_mode() {
        let args = sync_args(&[
            "archive",
            "sync",
            "a",
            "b",
            "--resolve-moves",
            "--allow-duplicate-increase",
            "--allow-duplicate-reduction",
        ]);
        assert_eq!(
            args.mode(),
            RelocationSyncMode::Move {
                allow_duplicate_increase: true,
                allow_duplicate_reduction: true,
            }
        );
    }

    #[test]
    fn additive_duplicating_mode() {
        let args = sync_args(&["archive", "sync", "a", "b", "--additive-duplicating"]);
        assert_eq!(args.mode(), RelocationSyncMode::AdditiveDuplicating);
    }

    #[test]
    fn duplicate_flags_require_resolve_moves() {
        let result =
            Cli::try_parse_from(["archive", "sync", "a", "b", "--allow-duplicate-increase"]);
        assert!(result.is_err());
    }

    #[test]
    fn additive_conflicts_with_resolve_moves() {
        let result = Cli::try_parse_from([
            "archive",
            "sync",
            "a",
            "b",
            "--resolve-moves",
            "--additive-duplicating",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn json_plan_requires_dry_run() {
        assert!(Cli::try_parse_from(["archive", "sync", "a", "b", "--json"]).is_err());
        let args = sync_args(&["archive", "sync", "a", "b", "--dry-run", "--json"]);
        assert!(args.json);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["archive", "compare", "a", "b", "-v", "--config", "s.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("s.toml")));
        assert_eq!(cli.command.unwrap().base(), Path::new("a"));
    }
}
