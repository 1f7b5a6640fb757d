//! CLI argument definitions (spec §6's CLI front end, C10).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[clap(name = "dfs-lineup-optimizer", about = "DFS lineup optimization CLI")]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build and rank lineups for a contest from a CSV player pool.
    Optimize {
        /// Path to a CSV player pool (see `collaborators::CsvPlayerDataProvider`).
        #[clap(long)]
        pool: PathBuf,

        /// `draftkings` or `fanduel`.
        #[clap(long, default_value = "draftkings")]
        platform: String,

        /// Sport key, e.g. `nfl`, `nba`, `golf`.
        #[clap(long)]
        sport: String,

        /// Salary cap for the contest.
        #[clap(long)]
        salary_cap: u32,

        /// Number of lineups to produce.
        #[clap(long, short = 'n', default_value_t = 1)]
        num_lineups: usize,

        /// Scoring strategy: max_ceiling, max_floor, balanced, contrarian, correlation, value.
        #[clap(long)]
        strategy: Option<String>,

        /// Player ids that must appear in every lineup (repeatable).
        #[clap(long = "lock")]
        locked_players: Vec<String>,

        /// Player ids excluded from consideration (repeatable).
        #[clap(long = "exclude")]
        excluded_players: Vec<String>,

        /// Minimum number of different players between any two emitted lineups.
        #[clap(long)]
        min_different_players: Option<usize>,

        /// Disable the correlation bonus in scoring.
        #[clap(long)]
        no_correlation: bool,

        /// Apply portfolio-level mean-variance/risk-parity reweighting.
        #[clap(long)]
        portfolio: bool,

        /// Use risk-parity weights instead of mean-variance (only with `--portfolio`).
        #[clap(long)]
        risk_parity: bool,

        /// Print the result as JSON instead of a text table.
        #[clap(long)]
        json: bool,

        /// Cache read-through pool snapshots and run results under the OS cache dir.
        #[clap(long)]
        cache: bool,

        /// Soft time budget for the search, in milliseconds.
        #[clap(long)]
        time_budget_ms: Option<u64>,
    },

    /// Print the slot grammar for a sport/platform combination.
    ShowSlots {
        #[clap(long)]
        sport: String,

        #[clap(long, default_value = "draftkings")]
        platform: String,
    },

    /// Load and filter a CSV pool, reporting counts without running the search.
    ValidatePool {
        #[clap(long)]
        pool: PathBuf,

        #[clap(long, default_value = "draftkings")]
        platform: String,
    },
}
