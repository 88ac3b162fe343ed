// CLI module for argument parsing and configuration

use crate::config::UserConfig;
use crate::copier::{ConflictPolicy, CopyOptions};
use crate::resume::{ResumeStore, DEFAULT_SESSION};
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

/// Shortlist - page through a folder of photos and copy the keepers
///
/// Right/Left move between images, Enter copies the current one into the
/// output directory. The position is saved as you go so a pass can be resumed.
#[derive(Parser, Debug, Clone)]
#[command(name = "shortlist")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory to scan for images (starts a new session)
    ///
    /// If omitted you are asked interactively.
    pub root: Option<PathBuf>,

    /// Directory shortlisted images are copied into
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Resume the saved session without prompting
    #[arg(long = "resume", action = ArgAction::SetTrue, conflicts_with = "root")]
    pub resume: bool,

    /// Name of the saved session; separate names keep separate positions
    #[arg(short = 's', long = "session", default_value = DEFAULT_SESSION)]
    pub session: String,

    /// Where session files are kept
    #[arg(long = "state-dir")]
    pub state_dir: Option<PathBuf>,

    /// Skip hidden files and directories (names starting with .)
    #[arg(long = "skip-hidden", action = ArgAction::SetTrue)]
    pub skip_hidden: bool,

    /// What to do when the output already has a different file of the same name
    #[arg(long = "conflict", value_enum)]
    pub conflict: Option<ConflictArg>,

    /// Log file (defaults to the user data directory)
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
}

/// Collision policy options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConflictArg {
    /// Keep both, naming the new copy "name (1).ext"
    Rename,
    /// Replace the existing file
    Overwrite,
}

impl From<ConflictArg> for ConflictPolicy {
    fn from(arg: ConflictArg) -> Self {
        match arg {
            ConflictArg::Rename => ConflictPolicy::Rename,
            ConflictArg::Overwrite => ConflictPolicy::Overwrite,
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate the arguments and return any errors
    pub fn validate(&self) -> Result<(), String> {
        if let Some(root) = &self.root {
            if !root.exists() {
                return Err(format!("Directory does not exist: {}", root.display()));
            }
            if !root.is_dir() {
                return Err(format!("Path is not a directory: {}", root.display()));
            }
        }

        if let Some(output) = &self.output {
            if output.exists() && !output.is_dir() {
                return Err(format!(
                    "Output path is not a directory: {}",
                    output.display()
                ));
            }
        }

        Ok(())
    }
}

/// Settings for one run: CLI flags layered over the user config
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub root: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub resume: bool,
    pub session: String,
    pub state_dir: Option<PathBuf>,
    pub skip_hidden: bool,
    pub log_file: Option<PathBuf>,
    pub copy: CopyOptions,
    pub prefetch: bool,
    pub exit_wait_secs: u64,
}

impl AppConfig {
    pub fn from_args(args: Args, user: &UserConfig) -> Self {
        AppConfig {
            root: args.root,
            output: args.output,
            resume: args.resume,
            session: args.session,
            state_dir: args.state_dir,
            skip_hidden: args.skip_hidden,
            log_file: args.log_file,
            copy: CopyOptions {
                conflict: args
                    .conflict
                    .map(ConflictPolicy::from)
                    .unwrap_or(user.conflict_policy),
                queue_capacity: user.copy_queue_capacity,
            },
            prefetch: user.prefetch,
            exit_wait_secs: user.exit_wait_secs,
        }
    }

    /// Resume store for the configured session, if a state directory is known
    pub fn resume_store(&self) -> Option<ResumeStore> {
        let dir = self.state_dir.clone().or_else(ResumeStore::default_dir)?;
        Some(ResumeStore::for_session(&dir, &self.session))
    }
}
