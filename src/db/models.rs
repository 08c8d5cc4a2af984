use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized play-by-play event, as produced by the ingestion layer.
///
/// Immutable once loaded: the analytics stages only ever derive new rows
/// from plays, they never write back to `pbp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Play {
    pub game_id: i64,
    pub play_id: i64,
    /// Ordering key within the game (ties broken by `entry`).
    pub play_sequence: i64,
    /// 0 for a normally logged play; 1/2 when the feed logs the same play
    /// twice (e.g. a sack that is also a fumble). Entry 2 is the "real"
    /// continuation point for lookahead purposes.
    pub entry: i64,
    /// 1–4 regulation, 5 = overtime.
    pub quarter: i64,
    /// None on kickoffs/administrative rows where the feed carries no down.
    pub down: Option<i64>,
    pub yards_to_go: Option<i64>,
    /// Side letter + yard line, e.g. "W35"; "C55" is midfield.
    pub field_position_start: Option<String>,
    /// Game clock at the snap, in seconds remaining in the quarter.
    pub play_clock_start_in_secs: Option<i64>,
    /// 4 = kickoff, 3 = one-point convert, 8/9 = two-point convert.
    pub play_type_id: i64,
    pub play_result_type_id: i64,
    pub play_result_points: i64,
    pub play_success_id: i64,
    pub play_change_of_possession_occurred: bool,
    /// Running scores *after* this play resolved.
    pub team_home_score: i64,
    pub team_visitor_score: i64,
    /// Possessing team.
    pub team_id: i64,
    pub team_abbreviation: String,
}

/// A scheduled or completed game. Read-only input to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub game_id: i64,
    pub year: i64,
    pub date_start: DateTime<Utc>,
    /// 4 = final.
    pub event_status_id: i64,
    /// 0 = exhibition (does not count), >= 1 = actual contest.
    pub event_type_id: i64,
    pub team_1_team_id: i64,
    pub team_1_score: i64,
    pub team_1_is_at_home: bool,
    pub team_1_is_winner: bool,
    pub team_2_team_id: i64,
    pub team_2_abbreviation: String,
    pub team_2_score: i64,
    pub team_2_is_at_home: bool,
    pub team_2_is_winner: bool,
}

impl Game {
    /// Whether this game updates ratings / derived tables at all.
    pub fn is_counted_final(&self) -> bool {
        self.event_status_id == 4 && self.event_type_id >= 1
    }
}

/// A play annotated with its drive assignment and prediction feature
/// context. One row per play; the `drives` derived table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveRow {
    pub year: i64,
    pub game_id: i64,
    pub play_id: i64,
    pub play_sequence: i64,
    pub entry: i64,
    /// Possessing team was the home side.
    pub home: bool,
    /// Possessing team went on to win the game.
    pub won: bool,
    /// Globally monotone across all games of a batch.
    pub drive_id: i64,
    /// 1-based, contiguous within the game.
    pub drive_sequence: i64,
    /// This play closed its drive.
    pub last_play: bool,
    /// Points scored on this play, oriented to the possessing team.
    pub points_scored: i64,
    /// Sum of `points_scored` over the whole drive, broadcast to members.
    pub points_scored_on_drive: i64,
    // Play phase; exactly one of these four is set.
    pub kickoff: bool,
    pub conv1: bool,
    pub conv2: bool,
    pub regular: bool,
    /// Yards from the possessing team's goal-to-score (0..=110).
    pub distance: Option<i64>,
    pub score_diff: i64,
    /// `score_diff / sqrt(time_remaining + 1)` — dampens early-game noise.
    pub score_diff_calc: f64,
    pub total_score: i64,
    /// Seconds remaining in regulation; 0 in overtime.
    pub time_remaining: Option<i64>,
    pub down: Option<i64>,
    pub yards_to_go: Option<i64>,
    pub ot: bool,
    pub quarter: i64,
}

/// Expected points / win probability and per-play added value, oriented to
/// both sides of the game. The `epa` derived table.
///
/// `None` means the play (or its lookahead endpoint) was excluded from
/// prediction because a required feature was missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRow {
    pub year: i64,
    pub game_id: i64,
    pub play_id: i64,
    pub play_sequence: i64,
    pub entry: i64,
    /// Possessing team's expected points on the current drive.
    pub ep: Option<f64>,
    /// Possessing team's expected points added.
    pub epa: Option<f64>,
    pub team_1_ep: Option<f64>,
    pub team_2_ep: Option<f64>,
    pub team_1_epa: Option<f64>,
    pub team_2_epa: Option<f64>,
    /// Possessing team's win probability.
    pub wp: Option<f64>,
    /// Possessing team's win probability added.
    pub wpa: Option<f64>,
    pub team_1_wp: Option<f64>,
    pub team_2_wp: Option<f64>,
    pub team_1_wpa: Option<f64>,
    pub team_2_wpa: Option<f64>,
}

/// Before/after ratings for one counted final game, for both ledgers.
/// The `elo` derived table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EloRow {
    pub year: i64,
    pub game_id: i64,
    pub team_1_team_id: i64,
    pub team_2_team_id: i64,
    pub team_1_elo_season_in: f64,
    pub team_1_elo_season_out: f64,
    pub team_2_elo_season_in: f64,
    pub team_2_elo_season_out: f64,
    pub team_1_elo_franchise_in: f64,
    pub team_1_elo_franchise_out: f64,
    pub team_2_elo_franchise_in: f64,
    pub team_2_elo_franchise_out: f64,
}

/// Composite excitement metrics for one game plus corpus-wide standings.
/// The `gei` derived table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcitementRow {
    pub year: i64,
    pub game_id: i64,
    /// Game Excitement Index: play-volume-normalized sum of |WPA|.
    pub gei: f64,
    /// Game Shootout Index: GEI scaled by total score vs corpus baseline.
    pub gsi: f64,
    /// Comeback factor: 1 / lowest win probability the winner ever held.
    pub cbf: f64,
    pub gei_pct: f64,
    pub gei_rank: i64,
    pub gsi_pct: f64,
    pub gsi_rank: i64,
    pub cbf_pct: f64,
    pub cbf_rank: i64,
}
