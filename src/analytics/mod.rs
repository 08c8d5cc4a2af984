//! The analytics pipeline: plays in, derived tables out.
//!
//! Stages run in dependency order over one scope (a year range or an
//! explicit game set): repair known-bad rows, segment plays into drives,
//! attribute per-play value with the predictor, replay Elo ratings, and
//! aggregate excitement metrics. Each stage's output is persisted with a
//! scoped delete-then-insert, so re-running a scope converges instead of
//! accumulating.

use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::config::{Config, YEAR_START_ADV};
use crate::db::models::{ExcitementRow, Game};
use crate::db::Database;

pub mod drives;
pub mod elo;
pub mod excitement;
pub mod features;
pub mod fixups;
pub mod predictor;
pub mod values;

use predictor::Predictor;

/// Load the scoped games in chronological order.
fn resolve_games(db: &Database, config: &Config) -> Result<Vec<Game>> {
    let games = if !config.game_ids.is_empty() {
        db.games_for_ids(&config.game_ids)?
    } else if let Some((start, end)) = config.year_range() {
        db.games_for_years(start, end)?
    } else {
        Vec::new()
    };
    if games.is_empty() {
        bail!("scope selects no games; nothing to process");
    }
    Ok(games)
}

/// Run every stage for the configured scope.
pub fn run(db: &Database, config: &Config, predictor: &Predictor) -> Result<()> {
    let games = resolve_games(db, config)?;
    let game_ids: Vec<i64> = games.iter().map(|g| g.game_id).collect();
    let games_by_id: HashMap<i64, Game> =
        games.iter().map(|g| (g.game_id, g.clone())).collect();
    info!(games = games.len(), "scope resolved");

    let mut plays = db.plays_for_games(&game_ids)?;
    if plays.is_empty() {
        if games.iter().all(|g| g.year < YEAR_START_ADV) {
            // Play-by-play coverage starts decades after game records do;
            // old scopes legitimately run the game-level stages alone.
            info!(
                "scope predates play-by-play coverage ({YEAR_START_ADV}); only game-level stages will produce rows"
            );
        } else {
            warn!("no plays stored for scope");
        }
    }
    fixups::apply(&mut plays);
    info!(plays = plays.len(), "plays loaded and repaired");

    let drive_rows = drives::segment(&games_by_id, &plays);
    db.replace_drives(&game_ids, &drive_rows)?;
    info!(rows = drive_rows.len(), "drives segmented");

    let value_rows = values::compute(&games_by_id, &plays, &drive_rows, predictor);
    db.replace_values(&game_ids, &value_rows)?;
    let predicted = value_rows.iter().filter(|v| v.wp.is_some()).count();
    info!(
        rows = value_rows.len(),
        predicted, "play values attributed"
    );

    if config.skip_elo {
        info!("elo stage skipped");
    } else {
        let elo_rows = elo::replay(db, &games)?;
        db.replace_elo(&game_ids, &elo_rows)?;
        info!(rows = elo_rows.len(), "elo ratings replayed");
    }

    if config.skip_excitement {
        info!("excitement stage skipped");
    } else {
        match excitement::load_averages(db)? {
            Some(averages) => {
                let fresh =
                    excitement::compute(&games_by_id, &drive_rows, &value_rows, &averages);
                // Standings are corpus-wide: merge the fresh rows into the
                // stored corpus and re-rank everything.
                let scope: HashSet<i64> = game_ids.iter().copied().collect();
                let mut corpus: Vec<ExcitementRow> = db
                    .all_excitement()?
                    .into_iter()
                    .filter(|r| !scope.contains(&r.game_id))
                    .collect();
                corpus.extend(fresh);
                excitement::rank(&mut corpus);
                db.replace_excitement_all(&corpus)?;
                info!(corpus = corpus.len(), "excitement metrics re-ranked");
            }
            None => warn!("no value rows in the corpus; excitement stage skipped"),
        }
    }

    Ok(())
}
