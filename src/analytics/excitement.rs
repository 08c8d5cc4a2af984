//! Game excitement metrics: GEI, GSI and the comeback factor.
//!
//! GEI measures how much the win-probability needle moved over the game,
//! normalized so long games don't win by volume alone. GSI scales that by
//! how high-scoring the game was relative to the corpus. CBF is the
//! reciprocal of the lowest win probability the eventual winner ever held:
//! a team that was down to a 4% chance and won posts a CBF of 25.
//!
//! Percentiles and ranks are standings across the whole stored corpus, so
//! any batch that adds or changes games re-ranks everything.

use std::collections::HashMap;

use anyhow::{Context, Result};
use tracing::warn;

use crate::config::YEAR_START_ADV_USEFUL;
use crate::db::models::{DriveRow, ExcitementRow, Game, ValueRow};
use crate::db::Database;

/// Corpus-wide reference averages the per-game metrics are normalized by.
///
/// Computed over counted games in the useful era that have value rows
/// (around 159 plays and 51 combined points per game historically).
#[derive(Debug, Clone, Copy)]
pub struct CorpusAverages {
    pub plays_per_game: f64,
    pub total_score: f64,
}

/// Load the reference averages, or `None` when no value rows exist yet.
pub fn load_averages(db: &Database) -> Result<Option<CorpusAverages>> {
    let plays = db
        .mean_plays_per_game(YEAR_START_ADV_USEFUL)
        .context("computing mean plays per game")?;
    let score = db
        .mean_total_score(YEAR_START_ADV_USEFUL)
        .context("computing mean total score")?;
    Ok(match (plays, score) {
        (Some(plays_per_game), Some(total_score)) => Some(CorpusAverages {
            plays_per_game,
            total_score,
        }),
        _ => None,
    })
}

/// Compute excitement rows for the scoped games. Percentile and rank
/// columns are left at zero; [`rank`] fills them corpus-wide.
///
/// `rows` and `values` are the drive and value tables for the same plays
/// in the same order, each game's run contiguous. Games present in `rows`
/// but absent from `values` (excluded upstream) are stepped over so the
/// two sequences stay aligned game by game.
pub fn compute(
    games: &HashMap<i64, Game>,
    rows: &[DriveRow],
    values: &[ValueRow],
    averages: &CorpusAverages,
) -> Vec<ExcitementRow> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut r_start = 0;
    while start < values.len() {
        let game_id = values[start].game_id;
        let mut end = start;
        while end < values.len() && values[end].game_id == game_id {
            end += 1;
        }
        while r_start < rows.len() && rows[r_start].game_id != game_id {
            r_start += 1;
        }
        let r_end = r_start + (end - start);

        if let Some(game) = games.get(&game_id) {
            if let Some(row) =
                compute_game(game, &rows[r_start..r_end], &values[start..end], averages)
            {
                out.push(row);
            }
        } else {
            warn!(game_id, "value rows reference a game with no game record; skipping");
        }
        start = end;
        r_start = r_end;
    }
    out
}

fn compute_game(
    game: &Game,
    rows: &[DriveRow],
    values: &[ValueRow],
    averages: &CorpusAverages,
) -> Option<ExcitementRow> {
    let n_plays = values.len() as f64;
    let swing: f64 = values
        .iter()
        .filter_map(|v| v.team_2_wpa)
        .map(f64::abs)
        .sum();
    let gei = (averages.plays_per_game / n_plays) * swing;

    let total_score = (game.team_1_score + game.team_2_score) as f64;
    let gsi = gei * (total_score / averages.total_score);

    // Lowest win probability the eventual winner held at any point.
    let winner_low = rows
        .iter()
        .zip(values)
        .filter_map(|(row, value)| {
            let wp = value.wp?;
            Some(if row.won { wp } else { 1.0 - wp })
        })
        .fold(None::<f64>, |low, wp| Some(low.map_or(wp, |l| l.min(wp))));
    let Some(winner_low) = winner_low else {
        warn!(game_id = game.game_id, "no win probabilities for game; skipping excitement row");
        return None;
    };

    Some(ExcitementRow {
        year: game.year,
        game_id: game.game_id,
        gei,
        gsi,
        cbf: 1.0 / winner_low,
        gei_pct: 0.0,
        gei_rank: 0,
        gsi_pct: 0.0,
        gsi_rank: 0,
        cbf_pct: 0.0,
        cbf_rank: 0,
    })
}

/// Fill percentile and rank columns across the whole corpus.
///
/// Percentile is the fraction of games at or below the value; rank is
/// descending with ties sharing the best position (the most exciting game
/// is rank 1).
pub fn rank(rows: &mut [ExcitementRow]) {
    let standings = |extract: fn(&ExcitementRow) -> f64, rows: &[ExcitementRow]| {
        let mut sorted: Vec<f64> = rows.iter().map(extract).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted
    };
    let gei_sorted = standings(|r| r.gei, rows);
    let gsi_sorted = standings(|r| r.gsi, rows);
    let cbf_sorted = standings(|r| r.cbf, rows);

    let n = rows.len();
    for row in rows.iter_mut() {
        let (gei_pct, gei_rank) = place(&gei_sorted, row.gei, n);
        let (gsi_pct, gsi_rank) = place(&gsi_sorted, row.gsi, n);
        let (cbf_pct, cbf_rank) = place(&cbf_sorted, row.cbf, n);
        row.gei_pct = gei_pct;
        row.gei_rank = gei_rank;
        row.gsi_pct = gsi_pct;
        row.gsi_rank = gsi_rank;
        row.cbf_pct = cbf_pct;
        row.cbf_rank = cbf_rank;
    }
}

/// (percentile, rank) of `value` within an ascending-sorted corpus.
fn place(sorted: &[f64], value: f64, n: usize) -> (f64, i64) {
    let at_or_below = sorted.partition_point(|v| v.total_cmp(&value).is_le());
    let pct = at_or_below as f64 / n as f64;
    let rank = 1 + (n - at_or_below) as i64;
    (pct, rank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn game(game_id: i64, score_1: i64, score_2: i64) -> Game {
        Game {
            game_id,
            year: 2022,
            date_start: Utc.with_ymd_and_hms(2022, 7, 1, 0, 0, 0).unwrap(),
            event_status_id: 4,
            event_type_id: 1,
            team_1_team_id: 1,
            team_1_score: score_1,
            team_1_is_at_home: false,
            team_1_is_winner: score_1 > score_2,
            team_2_team_id: 2,
            team_2_abbreviation: "HAM".into(),
            team_2_score: score_2,
            team_2_is_at_home: true,
            team_2_is_winner: score_2 > score_1,
        }
    }

    fn drive_row(game_id: i64, seq: i64, won: bool) -> DriveRow {
        DriveRow {
            year: 2022,
            game_id,
            play_id: game_id * 100 + seq,
            play_sequence: seq,
            entry: 0,
            home: true,
            won,
            drive_id: 1,
            drive_sequence: 1,
            last_play: false,
            points_scored: 0,
            points_scored_on_drive: 0,
            kickoff: false,
            conv1: false,
            conv2: false,
            regular: true,
            distance: Some(55),
            score_diff: 0,
            score_diff_calc: 0.0,
            total_score: 0,
            time_remaining: Some(1800),
            down: Some(1),
            yards_to_go: Some(10),
            ot: false,
            quarter: 2,
        }
    }

    fn value_row(game_id: i64, seq: i64, wp: Option<f64>, team_2_wpa: Option<f64>) -> ValueRow {
        ValueRow {
            year: 2022,
            game_id,
            play_id: game_id * 100 + seq,
            play_sequence: seq,
            entry: 0,
            ep: None,
            epa: None,
            team_1_ep: None,
            team_2_ep: None,
            team_1_epa: None,
            team_2_epa: None,
            wp,
            wpa: None,
            team_1_wp: wp.map(|w| 1.0 - w),
            team_2_wp: wp,
            team_1_wpa: team_2_wpa.map(|w| -w),
            team_2_wpa,
        }
    }

    const AVG: CorpusAverages = CorpusAverages {
        plays_per_game: 150.0,
        total_score: 50.0,
    };

    #[test]
    fn gei_normalizes_for_game_length() {
        let games = HashMap::from([(10, game(10, 20, 27))]);
        let rows = vec![drive_row(10, 1, true), drive_row(10, 2, true)];
        let values = vec![
            value_row(10, 1, Some(0.5), Some(0.2)),
            value_row(10, 2, Some(0.9), Some(-0.3)),
        ];
        let out = compute(&games, &rows, &values, &AVG);
        // (150 / 2) * (0.2 + 0.3)
        assert_relative_eq!(out[0].gei, 37.5);
        // GSI scales by total score vs the corpus: 47 / 50.
        assert_relative_eq!(out[0].gsi, 37.5 * 47.0 / 50.0);
    }

    #[test]
    fn cbf_tracks_the_winners_lowest_odds() {
        let games = HashMap::from([(10, game(10, 20, 27))]);
        // Home side (possessing throughout, `won` true) dipped to 10%.
        let rows = vec![drive_row(10, 1, true), drive_row(10, 2, true)];
        let values = vec![
            value_row(10, 1, Some(0.1), Some(0.0)),
            value_row(10, 2, Some(0.8), Some(0.0)),
        ];
        let out = compute(&games, &rows, &values, &AVG);
        assert_relative_eq!(out[0].cbf, 10.0);

        // Same probabilities but the possessing team lost: the winner's
        // low point is 1 - 0.8 = 0.2.
        let rows = vec![drive_row(10, 1, false), drive_row(10, 2, false)];
        let values = vec![
            value_row(10, 1, Some(0.1), Some(0.0)),
            value_row(10, 2, Some(0.8), Some(0.0)),
        ];
        let out = compute(&games, &rows, &values, &AVG);
        assert_relative_eq!(out[0].cbf, 5.0);
    }

    #[test]
    fn absent_wpa_rows_still_count_toward_play_volume() {
        let games = HashMap::from([(10, game(10, 20, 27))]);
        let rows = vec![drive_row(10, 1, true), drive_row(10, 2, true)];
        let values = vec![
            value_row(10, 1, Some(0.5), Some(0.2)),
            value_row(10, 2, Some(0.9), None), // excluded from prediction
        ];
        let out = compute(&games, &rows, &values, &AVG);
        // Denominator is still 2 plays; the gap just adds no swing.
        assert_relative_eq!(out[0].gei, (150.0 / 2.0) * 0.2);
    }

    #[test]
    fn drive_rows_without_values_do_not_shift_alignment() {
        // Game 5 has drive rows but was excluded from value attribution.
        // Game 10's winner-orientation must come from its own drive rows,
        // not from the orphaned prefix.
        let games = HashMap::from([(10, game(10, 20, 27))]);
        let rows = vec![
            drive_row(5, 1, false),
            drive_row(5, 2, false),
            drive_row(10, 1, true),
            drive_row(10, 2, true),
        ];
        let values = vec![
            value_row(10, 1, Some(0.1), Some(0.0)),
            value_row(10, 2, Some(0.8), Some(0.0)),
        ];
        let out = compute(&games, &rows, &values, &AVG);
        assert_eq!(out.len(), 1);
        // `won` is true on game 10's rows, so the winner's low is 0.1.
        // A misaligned read of game 5's rows would flip it to 0.2.
        assert_relative_eq!(out[0].cbf, 10.0);
    }

    #[test]
    fn game_without_any_probabilities_is_skipped() {
        let games = HashMap::from([(10, game(10, 20, 27))]);
        let rows = vec![drive_row(10, 1, true)];
        let values = vec![value_row(10, 1, None, None)];
        assert!(compute(&games, &rows, &values, &AVG).is_empty());
    }

    #[test]
    fn single_game_corpus_ranks_first() {
        let mut rows = vec![ExcitementRow {
            year: 2022,
            game_id: 10,
            gei: 3.0,
            gsi: 2.5,
            cbf: 4.0,
            gei_pct: 0.0,
            gei_rank: 0,
            gsi_pct: 0.0,
            gsi_rank: 0,
            cbf_pct: 0.0,
            cbf_rank: 0,
        }];
        rank(&mut rows);
        assert_relative_eq!(rows[0].gei_pct, 1.0);
        assert_eq!(rows[0].gei_rank, 1);
        assert_eq!(rows[0].cbf_rank, 1);
    }

    #[test]
    fn ranks_descend_as_percentiles_climb() {
        let template = ExcitementRow {
            year: 2022,
            game_id: 0,
            gei: 0.0,
            gsi: 0.0,
            cbf: 1.0,
            gei_pct: 0.0,
            gei_rank: 0,
            gsi_pct: 0.0,
            gsi_rank: 0,
            cbf_pct: 0.0,
            cbf_rank: 0,
        };
        let mut rows: Vec<ExcitementRow> = [1.0, 4.0, 2.0, 4.0]
            .iter()
            .enumerate()
            .map(|(i, &gei)| ExcitementRow {
                game_id: i as i64 + 1,
                gei,
                ..template.clone()
            })
            .collect();
        rank(&mut rows);

        // Dullest game: everything else beats it.
        assert_eq!(rows[0].gei_rank, 4);
        assert_relative_eq!(rows[0].gei_pct, 0.25);
        // Tied top games share rank 1 and the full percentile.
        assert_eq!(rows[1].gei_rank, 1);
        assert_eq!(rows[3].gei_rank, 1);
        assert_relative_eq!(rows[1].gei_pct, 1.0);
        // Middle game: two above it.
        assert_eq!(rows[2].gei_rank, 3);
        assert_relative_eq!(rows[2].gei_pct, 0.5);
    }
}
