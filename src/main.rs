//! Entry point: parse CLI and dispatch to command handlers.

use clap::Parser;
use dfs_lineup_optimizer::cli::{Cli, Commands};
use dfs_lineup_optimizer::commands::{handle_optimize, handle_show_slots, handle_validate_pool};
use dfs_lineup_optimizer::Result;

/// Run the CLI.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let app = Cli::parse();

    match app.command {
        Commands::Optimize {
            pool,
            platform,
            sport,
            salary_cap,
            num_lineups,
            strategy,
            locked_players,
            excluded_players,
            min_different_players,
            no_correlation,
            portfolio,
            risk_parity,
            json,
            cache,
            time_budget_ms,
        } => {
            handle_optimize(
                &pool,
                &platform,
                &sport,
                salary_cap,
                num_lineups,
                strategy.as_deref(),
                &locked_players,
                &excluded_players,
                min_different_players,
                no_correlation,
                portfolio,
                risk_parity,
                json,
                cache,
                time_budget_ms,
            )
            .await?
        }

        Commands::ShowSlots { sport, platform } => handle_show_slots(&sport, &platform)?,

        Commands::ValidatePool { pool, platform } => handle_validate_pool(&pool, &platform)?,
    }

    Ok(())
}
