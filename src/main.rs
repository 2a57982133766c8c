mod cli;
mod client;
mod config;
mod models;
mod ui;
mod view;

use anyhow::{bail, Result};
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use client::SchedulerClient;
use config::Config;
use ui::run_tui;
use view::RenderState;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Stderr logging is only safe outside the alternate screen.
    if !matches!(&cli.command, None | Some(Commands::Tui)) {
        env_logger::init();
    }

    let config = Config::load(cli.config)?;
    let client = SchedulerClient::new(config.base_url.clone());
    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Some(Commands::Plugins) => {
            if config.plugins.is_empty() {
                println!("{}", Config::guidance_message());
            } else {
                for plugin in &config.plugins {
                    println!("{}", plugin);
                }
            }
        }
        Some(Commands::Tasks { plugin }) => {
            if !config.plugins.iter().any(|p| p == &plugin) {
                bail!(
                    "Plugin '{}' is not configured (configured: {})",
                    plugin,
                    config.plugins.join(", ")
                );
            }
            let tasks = rt.block_on(client.list_tasks(&plugin))?;
            print_task_table(&plugin, tasks);
        }
        Some(Commands::Trigger { plugin, task_id }) => {
            if !config.can_trigger() {
                bail!(
                    "Operator lacks the '{}' permission; add it to the \"permissions\" array in {}",
                    config::TRIGGER_PERMISSION,
                    Config::default_path().display()
                );
            }
            let outcome = rt
                .block_on(client.trigger_task(&plugin, &task_id))
                .map_err(|e| format!("{:#}", e));
            let failed = outcome.is_err();
            let notification = view::trigger_notification(&task_id, &outcome);
            println!("{}", notification.message);
            if failed {
                std::process::exit(1);
            }
        }
        Some(Commands::Completions { shell }) => {
            use clap_complete::{generate, Shell};
            let shell = shell.to_lowercase();
            let shell_enum = match shell.as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "elvish" => Shell::Elvish,
                "powershell" => Shell::PowerShell,
                _ => {
                    println!("Unsupported shell: {}", shell);
                    return Ok(());
                }
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "schedview", &mut std::io::stdout());
        }
        Some(Commands::Tui) | None => {
            run_tui(config, client, rt.handle().clone())?;
        }
    }

    Ok(())
}

fn print_task_table(plugin: &str, tasks: Vec<models::TaskRecord>) {
    match view::resolve(plugin, &models::FetchState::Ready(tasks)) {
        RenderState::Empty(notice) => println!("{}", notice),
        RenderState::Table(rows) => {
            println!(
                "{:<34} {:<12} {:<21} {:<21}",
                "TASK", "STATUS", "LAST RUN", "NEXT RUN"
            );
            for row in rows {
                println!(
                    "{:<34} {:<12} {:<21} {:<21}",
                    row.id_cell(),
                    row.status.label(),
                    row.last_run,
                    row.next_run
                );
            }
        }
        // Ready input cannot resolve to the loading or errored panes.
        RenderState::Loading | RenderState::Errored(_) => unreachable!(),
    }
}
