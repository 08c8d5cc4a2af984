//! Fixed repairs for known-bad historical rows.
//!
//! These are deliberate, surgical overrides for specific defects in the
//! upstream feed, not general cleaning. Changing them changes every derived
//! table downstream, so each rule targets exactly the rows it names.

use crate::db::models::Play;

/// Play 122546 shipped with an empty play clock; the broadcast log shows
/// 4:28 remaining in the quarter.
const BAD_CLOCK_PLAY_ID: i64 = 122546;
const BAD_CLOCK_SECS: i64 = 4 * 60 + 28;

/// Apply the known-row overrides in place. Safe to run repeatedly.
pub fn apply(plays: &mut [Play]) {
    for play in plays.iter_mut() {
        if play.play_id == BAD_CLOCK_PLAY_ID && play.play_clock_start_in_secs.is_none() {
            play.play_clock_start_in_secs = Some(BAD_CLOCK_SECS);
        }
        match play.down {
            // One season's feed miskeyed a first down as down 11.
            Some(11) => play.down = Some(1),
            // Down 0 means "no down applies"; clear it rather than letting
            // a zero leak into the feature vector.
            Some(0) => {
                play.down = None;
                play.yards_to_go = None;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(play_id: i64, down: Option<i64>) -> Play {
        Play {
            game_id: 1,
            play_id,
            play_sequence: 1,
            entry: 0,
            quarter: 1,
            down,
            yards_to_go: Some(10),
            field_position_start: Some("W35".into()),
            play_clock_start_in_secs: None,
            play_type_id: 1,
            play_result_type_id: 0,
            play_result_points: 0,
            play_success_id: 0,
            play_change_of_possession_occurred: false,
            team_home_score: 0,
            team_visitor_score: 0,
            team_id: 1,
            team_abbreviation: "WPG".into(),
        }
    }

    #[test]
    fn repairs_known_clock_row() {
        let mut plays = vec![play(122546, Some(1))];
        apply(&mut plays);
        assert_eq!(plays[0].play_clock_start_in_secs, Some(268));
    }

    #[test]
    fn miskeyed_down_eleven_becomes_first_down() {
        let mut plays = vec![play(7, Some(11))];
        apply(&mut plays);
        assert_eq!(plays[0].down, Some(1));
    }

    #[test]
    fn down_zero_clears_down_and_yards() {
        let mut plays = vec![play(8, Some(0))];
        apply(&mut plays);
        assert_eq!(plays[0].down, None);
        assert_eq!(plays[0].yards_to_go, None);
    }

    #[test]
    fn idempotent_on_clean_rows() {
        let mut plays = vec![play(9, Some(2))];
        let before = plays[0].down;
        apply(&mut plays);
        apply(&mut plays);
        assert_eq!(plays[0].down, before);
    }
}
