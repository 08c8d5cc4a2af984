//! Elo rating replay over a chronological slice of games.
//!
//! Two ledgers run side by side and never mix. The season ledger restarts
//! from the baseline every year and answers "how good is this team right
//! now"; the franchise ledger persists across years, regressed a third of
//! the way back to the baseline at each season boundary, and answers "how
//! good has this club been historically".
//!
//! A replay is scoped: ratings for teams first seen mid-stream are seeded
//! from the latest persisted rating before the game's date, so re-running
//! one season (or one game) picks up where the stored history left off.

use std::collections::HashMap;

use anyhow::Result;

use crate::db::models::{EloRow, Game};
use crate::db::Database;

/// Rating every ledger starts from.
pub const ELO_BASELINE: f64 = 1500.0;
/// Rating-point edge granted to the home side before computing expectation.
const HOME_EDGE: f64 = 65.0;
/// Spread of the logistic expectation curve, in rating points.
const EXPECTED_DIVISOR: f64 = 550.0;
/// Base K-factor before the margin-of-victory and upset scaling.
const MOV_SCALE: f64 = 20.0;

/// Pull a franchise rating a third of the way back to the baseline.
fn regress_franchise(rating: f64) -> f64 {
    (rating - ELO_BASELINE) * (2.0 / 3.0) + ELO_BASELINE
}

/// Seed a team's (season, franchise) ratings from persisted history.
///
/// The latest stored rating from the same year carries over unchanged; one
/// from an earlier year crosses a season boundary, which resets the season
/// ledger and regresses the franchise ledger. No history at all means both
/// start at the baseline.
fn seed(db: &Database, team_id: i64, game: &Game) -> Result<(f64, f64)> {
    match db.latest_elo_before(team_id, game.date_start)? {
        Some(prev) if prev.year == game.year => Ok((prev.season_out, prev.franchise_out)),
        Some(prev) => Ok((ELO_BASELINE, regress_franchise(prev.franchise_out))),
        None => Ok((ELO_BASELINE, ELO_BASELINE)),
    }
}

/// Per-side home edge in rating points.
fn home_edge(game: &Game) -> (f64, f64) {
    if game.team_1_is_at_home {
        (HOME_EDGE, -HOME_EDGE)
    } else if game.team_2_is_at_home {
        (-HOME_EDGE, HOME_EDGE)
    } else {
        (0.0, 0.0)
    }
}

/// Actual result as (team_1, team_2) scores in [0, 1]; ties split evenly.
fn actual(game: &Game) -> (f64, f64) {
    if game.team_1_score > game.team_2_score {
        (1.0, 0.0)
    } else if game.team_2_score > game.team_1_score {
        (0.0, 1.0)
    } else {
        (0.5, 0.5)
    }
}

/// Expected score for a side holding `diff` rating points over its opponent
/// (home edge included).
fn expected(diff: f64) -> f64 {
    1.0 / (10f64.powf(-diff / EXPECTED_DIVISOR) + 1.0)
}

/// Rate one game within one ledger, returning the post-game ratings.
///
/// The shared rating change scales with the margin of victory and shrinks
/// when the higher-rated team is the one that won (beating a weaker side
/// by a lot is less informative than an upset by the same margin).
fn rate(elo_1_in: f64, elo_2_in: f64, game: &Game) -> (f64, f64) {
    let (edge_1, edge_2) = home_edge(game);
    let (win_1, win_2) = actual(game);
    let we_1 = expected((elo_1_in - elo_2_in) + edge_1);
    let we_2 = expected((elo_2_in - elo_1_in) + edge_2);

    let (winner_elo, loser_elo) = if game.team_2_score > game.team_1_score {
        (elo_2_in, elo_1_in)
    } else {
        (elo_1_in, elo_2_in)
    };
    let margin = (game.team_1_score - game.team_2_score).abs() as f64;
    let change = MOV_SCALE * (margin + 1.0).ln() * (2.2 / ((winner_elo - loser_elo) * 0.001 + 2.2));

    (
        elo_1_in + (win_1 - we_1) * change,
        elo_2_in + (win_2 - we_2) * change,
    )
}

/// Replay `games` (already in chronological order) and return one rating
/// row per counted final.
///
/// Every game in the slice participates in seeding and season-boundary
/// bookkeeping, but only counted finals move ratings or produce rows.
/// The boundary regression is skipped when a team had to be seeded on the
/// boundary game itself: its seed already crossed the season line.
pub fn replay(db: &Database, games: &[Game]) -> Result<Vec<EloRow>> {
    let mut season: HashMap<i64, f64> = HashMap::new();
    let mut franchise: HashMap<i64, f64> = HashMap::new();
    let mut rows = Vec::new();
    let mut prev_year: Option<i64> = None;

    for game in games {
        let mut possibly_regress = true;
        for team_id in [game.team_1_team_id, game.team_2_team_id] {
            if !season.contains_key(&team_id) {
                let (s, f) = seed(db, team_id, game)?;
                season.insert(team_id, s);
                franchise.insert(team_id, f);
                possibly_regress = false;
            }
        }
        if prev_year.is_some_and(|y| y != game.year) && possibly_regress {
            for rating in season.values_mut() {
                *rating = ELO_BASELINE;
            }
            for rating in franchise.values_mut() {
                *rating = regress_franchise(*rating);
            }
        }

        if game.is_counted_final() {
            let season_1_in = season[&game.team_1_team_id];
            let season_2_in = season[&game.team_2_team_id];
            let (season_1_out, season_2_out) = rate(season_1_in, season_2_in, game);
            season.insert(game.team_1_team_id, season_1_out);
            season.insert(game.team_2_team_id, season_2_out);

            let franchise_1_in = franchise[&game.team_1_team_id];
            let franchise_2_in = franchise[&game.team_2_team_id];
            let (franchise_1_out, franchise_2_out) = rate(franchise_1_in, franchise_2_in, game);
            franchise.insert(game.team_1_team_id, franchise_1_out);
            franchise.insert(game.team_2_team_id, franchise_2_out);

            rows.push(EloRow {
                year: game.year,
                game_id: game.game_id,
                team_1_team_id: game.team_1_team_id,
                team_2_team_id: game.team_2_team_id,
                team_1_elo_season_in: season_1_in,
                team_1_elo_season_out: season_1_out,
                team_2_elo_season_in: season_2_in,
                team_2_elo_season_out: season_2_out,
                team_1_elo_franchise_in: franchise_1_in,
                team_1_elo_franchise_out: franchise_1_out,
                team_2_elo_franchise_in: franchise_2_in,
                team_2_elo_franchise_out: franchise_2_out,
            });
        }
        prev_year = Some(game.year);
    }
    Ok(rows)
}
