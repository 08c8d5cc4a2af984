//! Drive segmentation.
//!
//! Walks each game's plays in (sequence, entry) order, deciding where one
//! possession ends and the next begins, and attributes points to plays and
//! drives. This is the only stage with no cross-game state, so games are
//! sharded across threads; global drive ids are assigned afterwards by
//! offsetting each game's local ids with the running total, in game order.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::warn;

use crate::analytics::features::{
    damped_score_diff, distance_to_goal, possession_context, score_diff, time_remaining,
    PhaseFlags,
};
use crate::db::models::{DriveRow, Game, Play};

/// Success codes that end a possession outright: conceded scores, resolved
/// kicks and converts. Anything not listed here (and not caught by the
/// result-type rules below) leaves the drive open.
const CLOSING_SUCCESS_IDS: [i64; 15] = [
    24,  // safety conceded
    110, // fumble returned for touchdown
    16,  // missed field goal returned for touchdown
    29,  // kickoff completed
    10,  // field goal good
    58,  // punt
    3,   // one-point convert good
    6,   // two-point convert good
    903, // failed two-point pass
    902, // failed two-point rush
    901, // failed one-point kick
    116, // one-point kick blocked
    111, // one-point kick missed
    13,  // missed field goal, single conceded
    11,  // missed field goal, turnover
];

/// Result type for a safety.
const RESULT_SAFETY: i64 = 10;
/// Result type for a scoring play (with points telling which kind).
const RESULT_SCORE: i64 = 1;
/// Success code for a sack, which on a two-point attempt ends the "drive".
const SUCCESS_SACK: i64 = 78;

/// Does this play close its drive?
///
/// Double-logged plays need care: a safety logged twice closes only via the
/// conceded-safety success code on its second entry, never from both rows.
fn closes_drive(play: &Play) -> bool {
    if CLOSING_SUCCESS_IDS.contains(&play.play_success_id) {
        return true;
    }
    if play.play_result_type_id == RESULT_SAFETY && play.entry == 0 {
        return true;
    }
    // Change of possession: field goal resolved, punt, turnover on downs,
    // missed FG, interception, fumble, end of half, end of game.
    if (2..=9).contains(&play.play_result_type_id) {
        return true;
    }
    if play.play_result_type_id == RESULT_SCORE && play.play_result_points == 6 {
        return true;
    }
    if play.play_result_type_id == RESULT_SCORE && play.play_success_id == SUCCESS_SACK {
        return true;
    }
    false
}

/// Segment every game's plays into drives.
///
/// `plays` must be ordered by (game_id, play_sequence, entry); each game's
/// run of plays must be contiguous. The returned rows keep that order.
pub fn segment(games: &HashMap<i64, Game>, plays: &[Play]) -> Vec<DriveRow> {
    let mut game_runs: Vec<(&Game, &[Play])> = Vec::new();
    let mut start = 0;
    while start < plays.len() {
        let game_id = plays[start].game_id;
        let mut end = start;
        while end < plays.len() && plays[end].game_id == game_id {
            end += 1;
        }
        match games.get(&game_id) {
            Some(game) => game_runs.push((game, &plays[start..end])),
            None => warn!(game_id, "plays reference a game with no game record; skipping"),
        }
        start = end;
    }

    let per_game: Vec<(Vec<DriveRow>, i64)> = game_runs
        .par_iter()
        .map(|(game, run)| segment_game(game, run))
        .collect();

    // Stitch local drive ids into one monotone sequence across games.
    let mut rows = Vec::with_capacity(plays.len());
    let mut offset = 0i64;
    for (mut game_rows, drives_closed) in per_game {
        for row in &mut game_rows {
            row.drive_id += offset;
        }
        offset += drives_closed;
        rows.append(&mut game_rows);
    }
    rows
}

/// Segment one game. Returns the annotated rows (drive ids local, starting
/// at 1) and the number of drives the game closed.
fn segment_game(game: &Game, plays: &[Play]) -> (Vec<DriveRow>, i64) {
    let mut rows = Vec::with_capacity(plays.len());
    let mut drive_sequence = 1i64;
    let mut drives_closed = 0i64;
    let mut prev_scores: Option<(i64, i64)> = None;

    for play in plays {
        let ctx = possession_context(play, game);
        let phase = PhaseFlags::from_play_type(play.play_type_id);

        // A kickoff always starts a fresh first-and-ten.
        let (down, yards_to_go) = if phase.kickoff {
            (Some(1), Some(10))
        } else {
            (play.down, play.yards_to_go)
        };

        let time_remaining = time_remaining(play.quarter, play.play_clock_start_in_secs);
        let distance = distance_to_goal(
            play.field_position_start.as_deref(),
            &play.team_abbreviation,
        );
        let diff = score_diff(play.team_home_score, play.team_visitor_score, ctx.home);

        let last_play = closes_drive(play);
        let points_scored = points_scored(play, ctx.home, &mut prev_scores);

        rows.push(DriveRow {
            year: game.year,
            game_id: play.game_id,
            play_id: play.play_id,
            play_sequence: play.play_sequence,
            entry: play.entry,
            home: ctx.home,
            won: ctx.won,
            drive_id: drive_sequence,
            drive_sequence,
            last_play,
            points_scored,
            points_scored_on_drive: 0, // broadcast below
            kickoff: phase.kickoff,
            conv1: phase.conv1,
            conv2: phase.conv2,
            regular: phase.regular,
            distance,
            score_diff: diff,
            score_diff_calc: damped_score_diff(diff, time_remaining),
            total_score: play.team_home_score + play.team_visitor_score,
            time_remaining,
            down,
            yards_to_go,
            ot: play.quarter >= 5,
            quarter: play.quarter,
        });

        if last_play {
            drive_sequence += 1;
            drives_closed += 1;
        }
    }

    broadcast_drive_points(&mut rows);
    (rows, drives_closed)
}

/// Points scored on this play, oriented to the possessing team, from the
/// running score delta. The first observed play takes the scoreboard as-is
/// (there is no previous state to diff against).
fn points_scored(play: &Play, possessing_home: bool, prev: &mut Option<(i64, i64)>) -> i64 {
    let current = (play.team_home_score, play.team_visitor_score);
    let points = match *prev {
        None => {
            if current == (0, 0) {
                0
            } else if possessing_home {
                current.0 - current.1
            } else {
                current.1 - current.0
            }
        }
        Some((home, visitor)) => {
            let d_home = current.0 - home;
            let d_visitor = current.1 - visitor;
            if possessing_home {
                d_home - d_visitor
            } else {
                d_visitor - d_home
            }
        }
    };
    *prev = Some(current);
    points
}

/// Set `points_scored_on_drive` on every row to the sum of its drive's
/// per-play points. Rows are all from one game, keyed by drive_sequence.
fn broadcast_drive_points(rows: &mut [DriveRow]) {
    let mut totals: HashMap<i64, i64> = HashMap::new();
    for row in rows.iter() {
        *totals.entry(row.drive_sequence).or_insert(0) += row.points_scored;
    }
    for row in rows.iter_mut() {
        row.points_scored_on_drive = totals[&row.drive_sequence];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn game() -> Game {
        Game {
            game_id: 100,
            year: 2022,
            date_start: Utc.with_ymd_and_hms(2022, 7, 1, 0, 0, 0).unwrap(),
            event_status_id: 4,
            event_type_id: 1,
            team_1_team_id: 1,
            team_1_score: 17,
            team_1_is_at_home: false,
            team_1_is_winner: false,
            team_2_team_id: 2,
            team_2_abbreviation: "HAM".into(),
            team_2_score: 24,
            team_2_is_at_home: true,
            team_2_is_winner: true,
        }
    }

    fn play(seq: i64, team_id: i64, type_id: i64, result_type: i64) -> Play {
        Play {
            game_id: 100,
            play_id: 1000 + seq,
            play_sequence: seq,
            entry: 0,
            quarter: 1,
            down: Some(1),
            yards_to_go: Some(10),
            field_position_start: Some("O35".into()),
            play_clock_start_in_secs: Some(800),
            play_type_id: type_id,
            play_result_type_id: result_type,
            play_result_points: 0,
            play_success_id: 0,
            play_change_of_possession_occurred: result_type != 0,
            team_home_score: 0,
            team_visitor_score: 0,
            team_id,
            team_abbreviation: if team_id == 2 { "HAM".into() } else { "TOR".into() },
        }
    }

    fn segment_one(plays: Vec<Play>) -> Vec<DriveRow> {
        let games = HashMap::from([(100, game())]);
        segment(&games, &plays)
    }

    #[test]
    fn drive_sequences_are_contiguous_from_one() {
        let rows = segment_one(vec![
            play(1, 1, 1, 0),
            play(2, 1, 1, 3), // punt: closes drive 1
            play(3, 2, 1, 0),
            play(4, 2, 1, 0),
            play(5, 2, 1, 9), // end of game: closes drive 2
        ]);
        let seqs: Vec<i64> = rows.iter().map(|r| r.drive_sequence).collect();
        assert_eq!(seqs, vec![1, 1, 2, 2, 2]);
        assert!(rows[1].last_play);
        assert!(!rows[0].last_play);
        assert!(rows[4].last_play);
    }

    #[test]
    fn drive_ids_stay_monotone_across_games() {
        let mut game_b = game();
        game_b.game_id = 200;
        game_b.date_start = Utc.with_ymd_and_hms(2022, 7, 8, 0, 0, 0).unwrap();
        let games = HashMap::from([(100, game()), (200, game_b)]);

        let mut plays = vec![
            play(1, 1, 1, 3), // game 100, drive 1 closes
            play(2, 2, 1, 9), // game 100, drive 2 closes
        ];
        let mut second = vec![play(1, 1, 1, 0), play(2, 1, 1, 9)];
        for p in &mut second {
            p.game_id = 200;
            p.play_id += 5000;
        }
        plays.extend(second);

        let rows = segment(&games, &plays);
        assert_eq!(
            rows.iter().map(|r| r.drive_id).collect::<Vec<_>>(),
            vec![1, 2, 3, 3]
        );
        // ...while per-game sequences reset.
        assert_eq!(
            rows.iter().map(|r| r.drive_sequence).collect::<Vec<_>>(),
            vec![1, 2, 1, 1]
        );
    }

    #[test]
    fn kickoff_forces_first_and_ten() {
        let mut kick = play(1, 1, 4, 0);
        kick.down = None;
        kick.yards_to_go = None;
        let rows = segment_one(vec![kick, play(2, 1, 1, 9)]);
        assert!(rows[0].kickoff);
        assert_eq!(rows[0].down, Some(1));
        assert_eq!(rows[0].yards_to_go, Some(10));
        assert!(rows[1].regular);
    }

    #[test]
    fn touchdown_closes_drive_and_scores_oriented_points() {
        let mut td = play(2, 2, 1, 1); // home team possession
        td.play_result_points = 6;
        td.team_home_score = 6;
        let mut convert = play(3, 2, 3, 0);
        convert.play_success_id = 3; // convert good
        convert.team_home_score = 7;
        let rows = segment_one(vec![play(1, 2, 1, 0), td, convert, play(4, 1, 1, 9)]);

        assert!(rows[1].last_play);
        assert_eq!(rows[1].points_scored, 6);
        // Convert is its own one-play "drive" worth one point.
        assert!(rows[2].last_play);
        assert_eq!(rows[2].points_scored, 1);
        assert_eq!(rows[2].conv1, true);
        // Broadcast: all members of drive 1 carry its 6 points.
        assert_eq!(rows[0].points_scored_on_drive, 6);
        assert_eq!(rows[1].points_scored_on_drive, 6);
        assert_eq!(rows[2].points_scored_on_drive, 1);
    }

    #[test]
    fn per_drive_points_equal_member_sum() {
        let mut fg = play(3, 1, 1, 2);
        fg.play_success_id = 10;
        fg.team_visitor_score = 3;
        let rows = segment_one(vec![play(1, 1, 1, 0), play(2, 1, 1, 0), fg, play(4, 2, 1, 9)]);
        let mut by_drive: HashMap<i64, (i64, i64)> = HashMap::new();
        for r in &rows {
            let e = by_drive.entry(r.drive_sequence).or_insert((0, r.points_scored_on_drive));
            e.0 += r.points_scored;
            assert_eq!(e.1, r.points_scored_on_drive);
        }
        for (sum, broadcast) in by_drive.values() {
            assert_eq!(sum, broadcast);
        }
    }

    #[test]
    fn double_logged_safety_closes_once() {
        // Sack-safety logged twice: entry 1 carries the safety result type,
        // entry 2 carries the conceded-safety success code.
        let mut first = play(5, 1, 1, RESULT_SAFETY);
        first.entry = 1;
        let mut second = play(5, 1, 1, RESULT_SAFETY);
        second.entry = 2;
        second.play_id = first.play_id;
        second.play_success_id = 24;
        second.team_home_score = 2;
        let rows = segment_one(vec![play(1, 1, 1, 0), first, second, play(6, 2, 1, 9)]);

        assert!(!rows[1].last_play, "entry 1 must not close the drive");
        assert!(rows[2].last_play, "entry 2 closes via success code 24");
        // Possessing team conceded two points.
        assert_eq!(rows[2].points_scored, -2);
    }

    #[test]
    fn single_logged_safety_closes_via_result_type() {
        let safety = play(2, 1, 1, RESULT_SAFETY);
        let rows = segment_one(vec![play(1, 1, 1, 0), safety, play(3, 2, 1, 9)]);
        assert!(rows[1].last_play);
    }

    #[test]
    fn sack_on_two_point_attempt_closes() {
        let mut sacked = play(3, 2, 8, RESULT_SCORE);
        sacked.play_success_id = SUCCESS_SACK;
        let rows = segment_one(vec![play(1, 2, 1, 0), sacked, play(4, 1, 1, 9)]);
        assert!(rows[1].last_play);
        assert!(rows[1].conv2);
    }

    #[test]
    fn unrecognized_codes_leave_drive_open() {
        let odd = play(2, 1, 1, 0); // result type 0, success 0: nothing matches
        let rows = segment_one(vec![play(1, 1, 1, 0), odd, play(3, 1, 1, 9)]);
        assert!(!rows[1].last_play);
        assert_eq!(rows[1].drive_sequence, 1);
    }

    #[test]
    fn first_play_with_nonzero_scoreboard_takes_score_directly() {
        // Scope starts mid-game: visitor already up 7-3, visitor possession.
        let mut mid = play(40, 1, 1, 0);
        mid.team_home_score = 3;
        mid.team_visitor_score = 7;
        let rows = segment_one(vec![mid, play(41, 1, 1, 9)]);
        assert_eq!(rows[0].points_scored, 4);
    }
}
