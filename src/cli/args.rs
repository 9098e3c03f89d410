//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

/// Rule-driven, multi-output template generation for source trees
#[derive(Parser, Debug)]
#[command(name = "genja")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Turn debugging information on (repeat for more: -d -d -d)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Project directory (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    /// Config file used instead of <project>/genja.toml
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render outdated outputs
    Generate(SelectionArgs),

    /// Show which outputs would be produced
    DryRun(SelectionArgs),

    /// Delete generated outputs
    Clean(SelectionArgs),

    /// Show registered rules per directory
    Rules,

    /// Show the extension mapping
    Extensions,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Which templates a run touches.
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Glob of directories relative to the root
    #[arg(default_value = ".")]
    pub dir_pattern: String,

    /// Glob of template file names
    #[arg(default_value = "*")]
    pub file_pattern: String,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Regenerate even if outputs are up to date
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
