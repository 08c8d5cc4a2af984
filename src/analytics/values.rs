//! Per-play value attribution: expected points added and win probability
//! added, oriented to both sides of the game.
//!
//! Side convention for the paired columns: `team_1` is the visiting side,
//! `team_2` the home side, regardless of how the game record orders its
//! teams. The single `wp`/`wpa`/`ep`/`epa` columns are the possessing
//! team's view of the same numbers.
//!
//! Attribution is a lookahead delta: a play's value is the change in the
//! model's estimate between this play and the next one. The chain is
//! anchored at known truths instead of model output wherever one exists —
//! the 50/50 prior before the opening play, the final result at the last
//! play of the game, and the drive's actual points at every drive close.

use std::collections::HashMap;

use tracing::warn;

use crate::analytics::features::feature_vector;
use crate::analytics::predictor::Predictor;
use crate::db::models::{DriveRow, Game, Play, ValueRow};

/// Result type marking the final play of a game.
const RESULT_END_OF_GAME: i64 = 9;

/// Compute value rows for every play.
///
/// `plays` and `rows` hold the same events in the same (game, sequence,
/// entry) order, each game's run contiguous; `rows` is the segmenter's
/// output for `plays`. Games the segmenter dropped (no game record) have
/// plays but no rows — their plays are stepped over so the two sequences
/// stay aligned game by game.
pub fn compute(
    games: &HashMap<i64, Game>,
    plays: &[Play],
    rows: &[DriveRow],
    predictor: &Predictor,
) -> Vec<ValueRow> {
    let mut out = Vec::with_capacity(rows.len());
    let mut start = 0;
    let mut p_start = 0;
    while start < rows.len() {
        let game_id = rows[start].game_id;
        let mut end = start;
        while end < rows.len() && rows[end].game_id == game_id {
            end += 1;
        }
        while p_start < plays.len() && plays[p_start].game_id != game_id {
            p_start += 1;
        }
        let p_end = p_start + (end - start);
        match games.get(&game_id) {
            Some(game) => compute_game(
                game,
                &plays[p_start..p_end],
                &rows[start..end],
                predictor,
                &mut out,
            ),
            None => warn!(game_id, "rows reference a game with no game record; skipping"),
        }
        start = end;
        p_start = p_end;
    }
    out
}

/// (team_1, team_2) win probability from the possessing team's estimate.
fn orient_wp(wp: Option<f64>, possessing_home: bool) -> (Option<f64>, Option<f64>) {
    if possessing_home {
        (wp.map(|w| 1.0 - w), wp)
    } else {
        (wp, wp.map(|w| 1.0 - w))
    }
}

/// (team_1, team_2) expected points from the possessing team's estimate.
/// Points expected for the possessing side are points against the other.
fn orient_ep(ep: Option<f64>, possessing_home: bool) -> (Option<f64>, Option<f64>) {
    if possessing_home {
        (ep.map(|e| -e), ep)
    } else {
        (ep, ep.map(|e| -e))
    }
}

fn delta(next: Option<f64>, current: Option<f64>) -> Option<f64> {
    match (next, current) {
        (Some(n), Some(c)) => Some(n - c),
        _ => None,
    }
}

fn compute_game(
    game: &Game,
    plays: &[Play],
    rows: &[DriveRow],
    predictor: &Predictor,
    out: &mut Vec<ValueRow>,
) {
    let (visitor_won, home_won) = if game.team_1_is_at_home {
        (game.team_2_is_winner, game.team_1_is_winner)
    } else {
        (game.team_1_is_winner, game.team_2_is_winner)
    };
    let t1_actual = if visitor_won { 1.0 } else { 0.0 };
    let t2_actual = if home_won { 1.0 } else { 0.0 };

    // Predictions, possessing team's view. None where features are missing.
    let preds: Vec<(Option<f64>, Option<f64>)> = rows
        .iter()
        .map(|row| match feature_vector(row) {
            Some(v) => {
                let p = predictor.predict(&v);
                (Some(p.expected_points), Some(p.win_probability))
            }
            None => (None, None),
        })
        .collect();

    let n = rows.len();
    for i in 0..n {
        let (ep, wp) = preds[i];
        let row = &rows[i];
        let (t1_wp, t2_wp) = orient_wp(wp, row.home);
        let (t1_ep, t2_ep) = orient_ep(ep, row.home);

        // Lookahead target: a double-logged play's continuation is two rows
        // on, past its twin.
        let next = if row.entry == 2 { i + 2 } else { i + 1 };

        let (t1_wpa, t2_wpa) = if i == 0 {
            // Opening play: value against the 50/50 prior.
            (t1_wp.map(|w| w - 0.5), t2_wp.map(|w| w - 0.5))
        } else if plays[i].play_result_type_id == RESULT_END_OF_GAME || next >= n {
            // Game is decided; the chain ends at the actual result.
            (
                t1_wp.map(|w| t1_actual - w),
                t2_wp.map(|w| t2_actual - w),
            )
        } else {
            let (next_t1, next_t2) = orient_wp(preds[next].1, rows[next].home);
            (delta(next_t1, t1_wp), delta(next_t2, t2_wp))
        };

        let (t1_epa, t2_epa) = if i == 0 {
            (t1_ep, t2_ep)
        } else if row.last_play || next >= n {
            // Drive resolved: anchor to the points it actually produced.
            let pts = row.points_scored_on_drive as f64;
            (t1_ep.map(|e| pts - e), t2_ep.map(|e| pts - e))
        } else {
            let (next_t1, next_t2) = orient_ep(preds[next].0, rows[next].home);
            (delta(next_t1, t1_ep), delta(next_t2, t2_ep))
        };

        let (wpa, epa) = if row.home {
            (t2_wpa, t2_epa)
        } else {
            (t1_wpa, t1_epa)
        };

        out.push(ValueRow {
            year: row.year,
            game_id: row.game_id,
            play_id: row.play_id,
            play_sequence: row.play_sequence,
            entry: row.entry,
            ep,
            epa,
            team_1_ep: t1_ep,
            team_2_ep: t2_ep,
            team_1_epa: t1_epa,
            team_2_epa: t2_epa,
            wp,
            wpa,
            team_1_wp: t1_wp,
            team_2_wp: t2_wp,
            team_1_wpa: t1_wpa,
            team_2_wpa: t2_wpa,
        });
    }
}
