use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Terminal admin console for plugin-scoped scheduled tasks", long_about = None)]
pub struct Cli {
    /// Config file path (default: ~/.schedview.json)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the configured plugins
    Plugins,
    /// Print the scheduled tasks of one plugin
    Tasks {
        #[arg(value_name = "PLUGIN")]
        plugin: String,
    },
    /// Trigger an immediate run of one task
    Trigger {
        #[arg(value_name = "PLUGIN")]
        plugin: String,
        #[arg(value_name = "TASK_ID")]
        task_id: String,
    },
    /// Launch TUI interface
    Tui,
    /// Generate shell completions
    Completions {
        #[arg(value_name = "SHELL")]
        shell: String,
    },
}
