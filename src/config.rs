use clap::Parser;

/// First season with any game records.
pub const YEAR_START_GAMES: i64 = 1958;
/// First season with play-by-play coverage.
pub const YEAR_START_ADV: i64 = 2004;
/// First season where play-by-play is clean enough to use for modeling.
/// Earlier advanced seasons are too noisy for reference averages.
pub const YEAR_START_ADV_USEFUL: i64 = 2009;
/// Season that was cancelled outright; selecting it alone is an error.
pub const YEAR_NOT_PLAYED: i64 = 2020;

/// Play-by-play analytics batch pipeline
#[derive(Parser, Debug, Clone)]
#[command(name = "gridiron-analytics", version, about)]
pub struct Config {
    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "gridiron.db")]
    pub database_path: String,

    /// Path to the trained predictor artifact (EP + WP forests, JSON)
    #[arg(long, env = "MODEL_PATH", default_value = "models/ep_wp_forest.json")]
    pub model_path: String,

    /// First year of the scope (inclusive)
    #[arg(long, env = "START_YEAR")]
    pub start_year: Option<i64>,

    /// Last year of the scope (inclusive; defaults to start_year)
    #[arg(long, env = "END_YEAR")]
    pub end_year: Option<i64>,

    /// Explicit game ids to process (comma separated); overrides years
    #[arg(long, env = "GAME_IDS", value_delimiter = ',')]
    pub game_ids: Vec<i64>,

    /// Skip the Elo replay stage
    #[arg(long, default_value = "false")]
    pub skip_elo: bool,

    /// Skip the excitement-index stage
    #[arg(long, default_value = "false")]
    pub skip_excitement: bool,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.game_ids.is_empty() && self.start_year.is_none() {
            anyhow::bail!("no scope selected: pass --start-year/--end-year or --game-ids");
        }
        if let Some(start) = self.start_year {
            let end = self.end_year.unwrap_or(start);
            if end < start {
                anyhow::bail!("end_year {} is before start_year {}", end, start);
            }
            if start < YEAR_START_GAMES {
                anyhow::bail!(
                    "start_year {} predates the first recorded season ({})",
                    start,
                    YEAR_START_GAMES
                );
            }
            if start == YEAR_NOT_PLAYED && end == YEAR_NOT_PLAYED {
                anyhow::bail!(
                    "the {} season was cancelled; widen the year range",
                    YEAR_NOT_PLAYED
                );
            }
        }
        Ok(())
    }

    /// The inclusive year range selected, if the scope is year-based.
    pub fn year_range(&self) -> Option<(i64, i64)> {
        self.start_year.map(|s| (s, self.end_year.unwrap_or(s)))
    }
}
