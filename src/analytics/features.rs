//! Per-play feature context and the fixed-width predictor input vector.
//!
//! The vector layout is part of the trained-artifact contract: the offline
//! trainer and this module must agree on the order of [`FEATURE_NAMES`].
//! Plays missing any required field are excluded from prediction entirely —
//! never zero-filled, since a fabricated down or field position would be a
//! plausible-looking but wrong game state.

use crate::db::models::{DriveRow, Game, Play};

/// Seconds per regulation quarter.
const QUARTER_SECS: i64 = 900;
/// Field length from goal line to goal line, in yards.
const FIELD_LENGTH: i64 = 110;

/// Play type codes carried on the feed.
pub const PLAY_TYPE_KICKOFF: i64 = 4;
pub const PLAY_TYPE_CONV1: i64 = 3;
pub const PLAY_TYPE_CONV2_A: i64 = 8;
pub const PLAY_TYPE_CONV2_B: i64 = 9;

/// Number of entries in the predictor input vector.
pub const NUM_FEATURES: usize = 19;

/// Vector layout, in order. Validated against the artifact on load.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "kickoff",
    "conv1",
    "conv2",
    "regular",
    "distance",
    "score_diff",
    "score_diff_calc",
    "total_score",
    "time_remaining",
    "yards_to_go",
    "ot",
    "down_1",
    "down_2",
    "down_3",
    "q_1",
    "q_2",
    "q_3",
    "q_4",
    "q_5",
];

/// Which side of the game the possessing team is on.
#[derive(Debug, Clone, Copy)]
pub struct PossessionContext {
    /// Possessing team is the home side.
    pub home: bool,
    /// Possessing team won the game.
    pub won: bool,
}

/// Resolve the possessing team's side from the game record.
pub fn possession_context(play: &Play, game: &Game) -> PossessionContext {
    if play.team_id == game.team_1_team_id {
        PossessionContext {
            home: game.team_1_is_at_home,
            won: game.team_1_is_winner,
        }
    } else {
        PossessionContext {
            home: game.team_2_is_at_home,
            won: game.team_2_is_winner,
        }
    }
}

/// Mutually exclusive play-phase tags derived from the play type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseFlags {
    pub kickoff: bool,
    pub conv1: bool,
    pub conv2: bool,
    pub regular: bool,
}

impl PhaseFlags {
    pub fn from_play_type(play_type_id: i64) -> Self {
        let kickoff = play_type_id == PLAY_TYPE_KICKOFF;
        let conv1 = play_type_id == PLAY_TYPE_CONV1;
        let conv2 = play_type_id == PLAY_TYPE_CONV2_A || play_type_id == PLAY_TYPE_CONV2_B;
        PhaseFlags {
            kickoff,
            conv1,
            conv2,
            regular: !kickoff && !conv1 && !conv2,
        }
    }
}

/// Seconds remaining in regulation at the snap. Overtime clocks don't run
/// toward a known horizon, so OT plays report 0.
pub fn time_remaining(quarter: i64, play_clock_start_in_secs: Option<i64>) -> Option<i64> {
    if quarter >= 5 {
        return Some(0);
    }
    play_clock_start_in_secs.map(|clock| (4 - quarter) * QUARTER_SECS + clock)
}

/// Yards between the ball and the goal line the possessing team is driving
/// toward. Field positions are side-letter + yard line ("W35", "O42");
/// "C55" is midfield. A side letter matching the possessing team's
/// abbreviation means the ball is in their own half.
pub fn distance_to_goal(field_position: Option<&str>, team_abbreviation: &str) -> Option<i64> {
    let fp = field_position?.trim();
    let mut chars = fp.chars();
    let side = chars.next()?;
    if !side.is_ascii_alphabetic() {
        return None;
    }
    let yard: i64 = chars.as_str().parse().ok()?;
    let own_half = team_abbreviation
        .chars()
        .next()
        .is_some_and(|c| c.eq_ignore_ascii_case(&side));
    if own_half {
        Some(FIELD_LENGTH - yard)
    } else {
        Some(yard)
    }
}

/// Score differential from the possessing team's point of view.
pub fn score_diff(home_score: i64, visitor_score: i64, possessing_home: bool) -> i64 {
    if possessing_home {
        home_score - visitor_score
    } else {
        visitor_score - home_score
    }
}

/// `score_diff / sqrt(time_remaining + 1)`: a late one-score lead says far
/// more about the outcome than an early one.
pub fn damped_score_diff(score_diff: i64, time_remaining: Option<i64>) -> f64 {
    match time_remaining {
        Some(t) => score_diff as f64 / ((t + 1) as f64).sqrt(),
        None => 0.0,
    }
}

/// Build the predictor input for one annotated play. Returns `None` when a
/// required field is missing (the play is excluded from prediction).
pub fn feature_vector(row: &DriveRow) -> Option<[f64; NUM_FEATURES]> {
    let distance = row.distance? as f64;
    let time_remaining = row.time_remaining? as f64;
    let down = row.down?;
    let yards_to_go = row.yards_to_go? as f64;

    let mut v = [0.0; NUM_FEATURES];
    v[0] = row.kickoff as u8 as f64;
    v[1] = row.conv1 as u8 as f64;
    v[2] = row.conv2 as u8 as f64;
    v[3] = row.regular as u8 as f64;
    v[4] = distance;
    v[5] = row.score_diff as f64;
    v[6] = row.score_diff_calc;
    v[7] = row.total_score as f64;
    v[8] = time_remaining;
    v[9] = yards_to_go;
    v[10] = row.ot as u8 as f64;
    if (1..=3).contains(&down) {
        v[10 + down as usize] = 1.0;
    }
    if (1..=5).contains(&row.quarter) {
        v[13 + row.quarter as usize] = 1.0;
    }
    Some(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn row() -> DriveRow {
        DriveRow {
            year: 2022,
            game_id: 1,
            play_id: 1,
            play_sequence: 1,
            entry: 0,
            home: true,
            won: true,
            drive_id: 1,
            drive_sequence: 1,
            last_play: false,
            points_scored: 0,
            points_scored_on_drive: 0,
            kickoff: false,
            conv1: false,
            conv2: false,
            regular: true,
            distance: Some(75),
            score_diff: 3,
            score_diff_calc: 3.0 / (1801.0_f64).sqrt(),
            total_score: 17,
            time_remaining: Some(1800),
            down: Some(2),
            yards_to_go: Some(7),
            ot: false,
            quarter: 2,
        }
    }

    #[test]
    fn distance_own_half_counts_from_far_goal() {
        assert_eq!(distance_to_goal(Some("W35"), "WPG"), Some(75));
    }

    #[test]
    fn distance_opponent_half_is_yard_line() {
        assert_eq!(distance_to_goal(Some("O42"), "WPG"), Some(42));
    }

    #[test]
    fn distance_midfield() {
        // "C" matches no team abbreviation here, so midfield reads as 55 out.
        assert_eq!(distance_to_goal(Some("C55"), "WPG"), Some(55));
    }

    #[test]
    fn distance_missing_or_garbled_is_none() {
        assert_eq!(distance_to_goal(None, "WPG"), None);
        assert_eq!(distance_to_goal(Some("35"), "WPG"), None);
        assert_eq!(distance_to_goal(Some("W"), "WPG"), None);
    }

    #[test]
    fn time_remaining_regulation_and_overtime() {
        assert_eq!(time_remaining(1, Some(900)), Some(3600));
        assert_eq!(time_remaining(4, Some(120)), Some(120));
        assert_eq!(time_remaining(4, None), None);
        assert_eq!(time_remaining(5, None), Some(0));
    }

    #[test]
    fn score_diff_orients_to_possession() {
        assert_eq!(score_diff(21, 14, true), 7);
        assert_eq!(score_diff(21, 14, false), -7);
    }

    #[test]
    fn damped_diff_shrinks_early_leads() {
        let early = damped_score_diff(7, Some(3600));
        let late = damped_score_diff(7, Some(60));
        assert!(late > early);
        assert_relative_eq!(damped_score_diff(7, Some(0)), 7.0, epsilon = 1e-12);
    }

    #[test]
    fn phase_flags_are_mutually_exclusive() {
        for type_id in [0, 1, 3, 4, 8, 9, 12] {
            let f = PhaseFlags::from_play_type(type_id);
            let set = [f.kickoff, f.conv1, f.conv2, f.regular]
                .iter()
                .filter(|b| **b)
                .count();
            assert_eq!(set, 1, "type {type_id}");
        }
        assert!(PhaseFlags::from_play_type(4).kickoff);
        assert!(PhaseFlags::from_play_type(3).conv1);
        assert!(PhaseFlags::from_play_type(8).conv2);
        assert!(PhaseFlags::from_play_type(9).conv2);
    }

    #[test]
    fn vector_layout_matches_names() {
        let v = feature_vector(&row()).unwrap();
        assert_eq!(v.len(), FEATURE_NAMES.len());
        assert_relative_eq!(v[3], 1.0); // regular
        assert_relative_eq!(v[4], 75.0); // distance
        assert_relative_eq!(v[9], 7.0); // yards_to_go
        assert_relative_eq!(v[12], 1.0); // down_2
        assert_relative_eq!(v[15], 1.0); // q_2
        assert_relative_eq!(v[11] + v[13], 0.0);
    }

    #[test]
    fn missing_required_field_excludes_play() {
        let mut r = row();
        r.down = None;
        assert!(feature_vector(&r).is_none());
        let mut r = row();
        r.distance = None;
        assert!(feature_vector(&r).is_none());
        let mut r = row();
        r.time_remaining = None;
        assert!(feature_vector(&r).is_none());
    }
}
