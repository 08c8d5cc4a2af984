use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub mod models;
use models::*;

/// Thread-safe SQLite connection (single connection with mutex).
///
/// All derived-table writes go through scoped `replace_*` operations that
/// delete the old rows for a set of game ids and insert the fresh ones in
/// one transaction. That delete-then-insert unit is the pipeline's commit
/// boundary: re-running an unchanged scope leaves tables byte-identical.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// The last persisted rating state for one team, used to seed a replay.
#[derive(Debug, Clone, Copy)]
pub struct PrevRating {
    /// Season the rating was recorded in.
    pub year: i64,
    pub season_out: f64,
    pub franchise_out: f64,
}

impl Database {
    /// Open (or create) the SQLite database at the given path.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// In-memory database, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent).
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Input tables (populated by the ingestion layer) ──────────────────────

    /// Insert or replace one game record.
    pub fn upsert_game(&self, game: &Game) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO games (
                game_id, year, date_start, event_status_id, event_type_id,
                team_1_team_id, team_1_score, team_1_is_at_home, team_1_is_winner,
                team_2_team_id, team_2_abbreviation, team_2_score,
                team_2_is_at_home, team_2_is_winner
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
            params![
                game.game_id,
                game.year,
                game.date_start,
                game.event_status_id,
                game.event_type_id,
                game.team_1_team_id,
                game.team_1_score,
                game.team_1_is_at_home,
                game.team_1_is_winner,
                game.team_2_team_id,
                game.team_2_abbreviation,
                game.team_2_score,
                game.team_2_is_at_home,
                game.team_2_is_winner,
            ],
        )?;
        Ok(())
    }

    /// Insert or replace one play record.
    pub fn upsert_play(&self, play: &Play) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO pbp (
                game_id, play_id, play_sequence, entry, quarter, down,
                yards_to_go, field_position_start, play_clock_start_in_secs,
                play_type_id, play_result_type_id, play_result_points,
                play_success_id, play_change_of_possession_occurred,
                team_home_score, team_visitor_score, team_id, team_abbreviation
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)",
            params![
                play.game_id,
                play.play_id,
                play.play_sequence,
                play.entry,
                play.quarter,
                play.down,
                play.yards_to_go,
                play.field_position_start,
                play.play_clock_start_in_secs,
                play.play_type_id,
                play.play_result_type_id,
                play.play_result_points,
                play.play_success_id,
                play.play_change_of_possession_occurred,
                play.team_home_score,
                play.team_visitor_score,
                play.team_id,
                play.team_abbreviation,
            ],
        )?;
        Ok(())
    }

    /// Games within an inclusive year range, in chronological order.
    pub fn games_for_years(&self, start: i64, end: i64) -> Result<Vec<Game>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {GAME_COLS} FROM games
             WHERE year >= ?1 AND year <= ?2 ORDER BY date_start, game_id"
        ))?;
        let games = stmt
            .query_map(params![start, end], map_game)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(games)
    }

    /// Games for an explicit id set, in chronological order.
    pub fn games_for_ids(&self, game_ids: &[i64]) -> Result<Vec<Game>> {
        if game_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {GAME_COLS} FROM games WHERE game_id IN ({})
             ORDER BY date_start, game_id",
            placeholders(game_ids.len())
        ))?;
        let games = stmt
            .query_map(rusqlite::params_from_iter(game_ids), map_game)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(games)
    }

    /// Ordered plays for a set of games. The (game_id, play_sequence, entry)
    /// order is load-bearing: the value-added lookahead scans positionally.
    pub fn plays_for_games(&self, game_ids: &[i64]) -> Result<Vec<Play>> {
        if game_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT game_id, play_id, play_sequence, entry, quarter, down,
                    yards_to_go, field_position_start, play_clock_start_in_secs,
                    play_type_id, play_result_type_id, play_result_points,
                    play_success_id, play_change_of_possession_occurred,
                    team_home_score, team_visitor_score, team_id, team_abbreviation
             FROM pbp WHERE game_id IN ({})
             ORDER BY game_id, play_sequence, entry",
            placeholders(game_ids.len())
        ))?;
        let plays = stmt
            .query_map(rusqlite::params_from_iter(game_ids), map_play)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(plays)
    }

    // ── Elo history ──────────────────────────────────────────────────────────

    /// The team's most recent persisted rating strictly before `before`.
    pub fn latest_elo_before(
        &self,
        team_id: i64,
        before: DateTime<Utc>,
    ) -> Result<Option<PrevRating>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT games.year, elo.team_1_team_id,
                    elo.team_1_elo_season_out, elo.team_1_elo_franchise_out,
                    elo.team_2_elo_season_out, elo.team_2_elo_franchise_out
             FROM elo JOIN games ON elo.game_id = games.game_id
             WHERE (elo.team_1_team_id = ?1 OR elo.team_2_team_id = ?1)
               AND games.date_start < ?2
             ORDER BY games.date_start DESC, games.game_id DESC LIMIT 1",
        )?;
        let row = stmt
            .query_row(params![team_id, before], |row| {
                let year: i64 = row.get(0)?;
                let team_1: i64 = row.get(1)?;
                let (season_out, franchise_out) = if team_1 == team_id {
                    (row.get(2)?, row.get(3)?)
                } else {
                    (row.get(4)?, row.get(5)?)
                };
                Ok(PrevRating {
                    year,
                    season_out,
                    franchise_out,
                })
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        Ok(row)
    }

    // ── Derived tables: scoped replace (delete-then-insert) ──────────────────

    /// Replace the drive rows for a set of games.
    pub fn replace_drives(&self, game_ids: &[i64], rows: &[DriveRow]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        delete_for_games(&tx, "drives", game_ids)?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO drives (
                    year, game_id, play_id, play_sequence, entry, home, won,
                    drive_id, drive_sequence, last_play, points_scored,
                    points_scored_on_drive, kickoff, conv1, conv2, regular,
                    distance, score_diff, score_diff_calc, total_score,
                    time_remaining, down, yards_to_go, ot, quarter
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,
                           ?16,?17,?18,?19,?20,?21,?22,?23,?24,?25)",
            )?;
            for r in rows {
                stmt.execute(params![
                    r.year,
                    r.game_id,
                    r.play_id,
                    r.play_sequence,
                    r.entry,
                    r.home,
                    r.won,
                    r.drive_id,
                    r.drive_sequence,
                    r.last_play,
                    r.points_scored,
                    r.points_scored_on_drive,
                    r.kickoff,
                    r.conv1,
                    r.conv2,
                    r.regular,
                    r.distance,
                    r.score_diff,
                    r.score_diff_calc,
                    r.total_score,
                    r.time_remaining,
                    r.down,
                    r.yards_to_go,
                    r.ot,
                    r.quarter,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Replace the EPA/WPA rows for a set of games.
    pub fn replace_values(&self, game_ids: &[i64], rows: &[ValueRow]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        delete_for_games(&tx, "epa", game_ids)?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO epa (
                    year, game_id, play_id, play_sequence, entry,
                    ep, epa, team_1_ep, team_2_ep, team_1_epa, team_2_epa,
                    wp, wpa, team_1_wp, team_2_wp, team_1_wpa, team_2_wpa
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)",
            )?;
            for r in rows {
                stmt.execute(params![
                    r.year,
                    r.game_id,
                    r.play_id,
                    r.play_sequence,
                    r.entry,
                    r.ep,
                    r.epa,
                    r.team_1_ep,
                    r.team_2_ep,
                    r.team_1_epa,
                    r.team_2_epa,
                    r.wp,
                    r.wpa,
                    r.team_1_wp,
                    r.team_2_wp,
                    r.team_1_wpa,
                    r.team_2_wpa,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Replace the Elo rows for a set of games.
    pub fn replace_elo(&self, game_ids: &[i64], rows: &[EloRow]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        delete_for_games(&tx, "elo", game_ids)?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO elo (
                    year, game_id, team_1_team_id, team_2_team_id,
                    team_1_elo_season_in, team_1_elo_season_out,
                    team_2_elo_season_in, team_2_elo_season_out,
                    team_1_elo_franchise_in, team_1_elo_franchise_out,
                    team_2_elo_franchise_in, team_2_elo_franchise_out
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
            )?;
            for r in rows {
                stmt.execute(params![
                    r.year,
                    r.game_id,
                    r.team_1_team_id,
                    r.team_2_team_id,
                    r.team_1_elo_season_in,
                    r.team_1_elo_season_out,
                    r.team_2_elo_season_in,
                    r.team_2_elo_season_out,
                    r.team_1_elo_franchise_in,
                    r.team_1_elo_franchise_out,
                    r.team_2_elo_franchise_in,
                    r.team_2_elo_franchise_out,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Replace the excitement rows for a set of games.
    pub fn replace_excitement(&self, game_ids: &[i64], rows: &[ExcitementRow]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        delete_for_games(&tx, "gei", game_ids)?;
        insert_excitement_rows(&tx, rows)?;
        tx.commit()?;
        Ok(())
    }

    /// Replace the *entire* excitement table. Percentiles and ranks are
    /// relative standings, so every re-rank rewrites the whole corpus.
    pub fn replace_excitement_all(&self, rows: &[ExcitementRow]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM gei", [])?;
        insert_excitement_rows(&tx, rows)?;
        tx.commit()?;
        Ok(())
    }

    // ── Derived tables: reads ────────────────────────────────────────────────

    /// Stored drive rows for a set of games, in pipeline order.
    pub fn drives_for_games(&self, game_ids: &[i64]) -> Result<Vec<DriveRow>> {
        if game_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT year, game_id, play_id, play_sequence, entry, home, won,
                    drive_id, drive_sequence, last_play, points_scored,
                    points_scored_on_drive, kickoff, conv1, conv2, regular,
                    distance, score_diff, score_diff_calc, total_score,
                    time_remaining, down, yards_to_go, ot, quarter
             FROM drives WHERE game_id IN ({})
             ORDER BY game_id, play_sequence, entry",
            placeholders(game_ids.len())
        ))?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(game_ids), map_drive)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Stored EPA/WPA rows for a set of games, in pipeline order.
    pub fn values_for_games(&self, game_ids: &[i64]) -> Result<Vec<ValueRow>> {
        if game_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT year, game_id, play_id, play_sequence, entry,
                    ep, epa, team_1_ep, team_2_ep, team_1_epa, team_2_epa,
                    wp, wpa, team_1_wp, team_2_wp, team_1_wpa, team_2_wpa
             FROM epa WHERE game_id IN ({})
             ORDER BY game_id, play_sequence, entry",
            placeholders(game_ids.len())
        ))?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(game_ids), map_value)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Every stored excitement row, for the corpus-wide re-rank.
    pub fn all_excitement(&self) -> Result<Vec<ExcitementRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT year, game_id, gei, gsi, cbf, gei_pct, gei_rank,
                    gsi_pct, gsi_rank, cbf_pct, cbf_rank
             FROM gei ORDER BY year, game_id",
        )?;
        let rows = stmt
            .query_map([], map_excitement)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ── Corpus reference constants ───────────────────────────────────────────

    /// Mean number of plays per game over counted games with value rows,
    /// restricted to the useful era.
    pub fn mean_plays_per_game(&self, useful_start_year: i64) -> Result<Option<f64>> {
        let conn = self.conn.lock().unwrap();
        let mean: Option<f64> = conn.query_row(
            "SELECT AVG(n) FROM (
                SELECT COUNT(*) AS n FROM epa
                JOIN games ON games.game_id = epa.game_id
                WHERE games.event_type_id > 0 AND epa.year >= ?1
                GROUP BY epa.game_id
             )",
            params![useful_start_year],
            |row| row.get(0),
        )?;
        Ok(mean)
    }

    /// Mean combined final score over counted games with value rows,
    /// restricted to the useful era.
    pub fn mean_total_score(&self, useful_start_year: i64) -> Result<Option<f64>> {
        let conn = self.conn.lock().unwrap();
        let mean: Option<f64> = conn.query_row(
            "SELECT AVG(team_1_score + team_2_score) FROM games
             WHERE event_type_id > 0 AND year >= ?1
               AND EXISTS (SELECT 1 FROM epa WHERE epa.game_id = games.game_id)",
            params![useful_start_year],
            |row| row.get(0),
        )?;
        Ok(mean)
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

const GAME_COLS: &str = "game_id, year, date_start, event_status_id, event_type_id,
        team_1_team_id, team_1_score, team_1_is_at_home, team_1_is_winner,
        team_2_team_id, team_2_abbreviation, team_2_score,
        team_2_is_at_home, team_2_is_winner";

fn placeholders(n: usize) -> String {
    let mut s = String::with_capacity(n * 2);
    for i in 0..n {
        if i > 0 {
            s.push(',');
        }
        s.push('?');
    }
    s
}

fn delete_for_games(tx: &rusqlite::Transaction, table: &str, game_ids: &[i64]) -> Result<()> {
    if game_ids.is_empty() {
        return Ok(());
    }
    tx.execute(
        &format!(
            "DELETE FROM {table} WHERE game_id IN ({})",
            placeholders(game_ids.len())
        ),
        rusqlite::params_from_iter(game_ids),
    )?;
    Ok(())
}

fn insert_excitement_rows(tx: &rusqlite::Transaction, rows: &[ExcitementRow]) -> Result<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO gei (
            year, game_id, gei, gsi, cbf, gei_pct, gei_rank,
            gsi_pct, gsi_rank, cbf_pct, cbf_rank
         ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
    )?;
    for r in rows {
        stmt.execute(params![
            r.year, r.game_id, r.gei, r.gsi, r.cbf, r.gei_pct, r.gei_rank, r.gsi_pct, r.gsi_rank,
            r.cbf_pct, r.cbf_rank,
        ])?;
    }
    Ok(())
}

fn map_game(row: &rusqlite::Row) -> rusqlite::Result<Game> {
    Ok(Game {
        game_id: row.get(0)?,
        year: row.get(1)?,
        date_start: row.get(2)?,
        event_status_id: row.get(3)?,
        event_type_id: row.get(4)?,
        team_1_team_id: row.get(5)?,
        team_1_score: row.get(6)?,
        team_1_is_at_home: row.get(7)?,
        team_1_is_winner: row.get(8)?,
        team_2_team_id: row.get(9)?,
        team_2_abbreviation: row.get(10)?,
        team_2_score: row.get(11)?,
        team_2_is_at_home: row.get(12)?,
        team_2_is_winner: row.get(13)?,
    })
}

fn map_play(row: &rusqlite::Row) -> rusqlite::Result<Play> {
    Ok(Play {
        game_id: row.get(0)?,
        play_id: row.get(1)?,
        play_sequence: row.get(2)?,
        entry: row.get(3)?,
        quarter: row.get(4)?,
        down: row.get(5)?,
        yards_to_go: row.get(6)?,
        field_position_start: row.get(7)?,
        play_clock_start_in_secs: row.get(8)?,
        play_type_id: row.get(9)?,
        play_result_type_id: row.get(10)?,
        play_result_points: row.get(11)?,
        play_success_id: row.get(12)?,
        play_change_of_possession_occurred: row.get(13)?,
        team_home_score: row.get(14)?,
        team_visitor_score: row.get(15)?,
        team_id: row.get(16)?,
        team_abbreviation: row.get(17)?,
    })
}

fn map_drive(row: &rusqlite::Row) -> rusqlite::Result<DriveRow> {
    Ok(DriveRow {
        year: row.get(0)?,
        game_id: row.get(1)?,
        play_id: row.get(2)?,
        play_sequence: row.get(3)?,
        entry: row.get(4)?,
        home: row.get(5)?,
        won: row.get(6)?,
        drive_id: row.get(7)?,
        drive_sequence: row.get(8)?,
        last_play: row.get(9)?,
        points_scored: row.get(10)?,
        points_scored_on_drive: row.get(11)?,
        kickoff: row.get(12)?,
        conv1: row.get(13)?,
        conv2: row.get(14)?,
        regular: row.get(15)?,
        distance: row.get(16)?,
        score_diff: row.get(17)?,
        score_diff_calc: row.get(18)?,
        total_score: row.get(19)?,
        time_remaining: row.get(20)?,
        down: row.get(21)?,
        yards_to_go: row.get(22)?,
        ot: row.get(23)?,
        quarter: row.get(24)?,
    })
}

fn map_value(row: &rusqlite::Row) -> rusqlite::Result<ValueRow> {
    Ok(ValueRow {
        year: row.get(0)?,
        game_id: row.get(1)?,
        play_id: row.get(2)?,
        play_sequence: row.get(3)?,
        entry: row.get(4)?,
        ep: row.get(5)?,
        epa: row.get(6)?,
        team_1_ep: row.get(7)?,
        team_2_ep: row.get(8)?,
        team_1_epa: row.get(9)?,
        team_2_epa: row.get(10)?,
        wp: row.get(11)?,
        wpa: row.get(12)?,
        team_1_wp: row.get(13)?,
        team_2_wp: row.get(14)?,
        team_1_wpa: row.get(15)?,
        team_2_wpa: row.get(16)?,
    })
}

fn map_excitement(row: &rusqlite::Row) -> rusqlite::Result<ExcitementRow> {
    Ok(ExcitementRow {
        year: row.get(0)?,
        game_id: row.get(1)?,
        gei: row.get(2)?,
        gsi: row.get(3)?,
        cbf: row.get(4)?,
        gei_pct: row.get(5)?,
        gei_rank: row.get(6)?,
        gsi_pct: row.get(7)?,
        gsi_rank: row.get(8)?,
        cbf_pct: row.get(9)?,
        cbf_rank: row.get(10)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS).
///
/// `games` and `pbp` are inputs owned by the ingestion layer; they are
/// created here so a fresh database is usable and tests can seed fixtures.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS games (
    game_id             INTEGER PRIMARY KEY,
    year                INTEGER NOT NULL,
    date_start          TEXT    NOT NULL,
    event_status_id     INTEGER NOT NULL,
    event_type_id       INTEGER NOT NULL,
    team_1_team_id      INTEGER NOT NULL,
    team_1_score        INTEGER NOT NULL,
    team_1_is_at_home   INTEGER NOT NULL,
    team_1_is_winner    INTEGER NOT NULL,
    team_2_team_id      INTEGER NOT NULL,
    team_2_abbreviation TEXT    NOT NULL,
    team_2_score        INTEGER NOT NULL,
    team_2_is_at_home   INTEGER NOT NULL,
    team_2_is_winner    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS pbp (
    game_id                            INTEGER NOT NULL,
    play_id                            INTEGER NOT NULL,
    play_sequence                      INTEGER NOT NULL,
    entry                              INTEGER NOT NULL DEFAULT 0,
    quarter                            INTEGER NOT NULL,
    down                               INTEGER,
    yards_to_go                        INTEGER,
    field_position_start               TEXT,
    play_clock_start_in_secs           INTEGER,
    play_type_id                       INTEGER NOT NULL,
    play_result_type_id                INTEGER NOT NULL,
    play_result_points                 INTEGER NOT NULL,
    play_success_id                    INTEGER NOT NULL,
    play_change_of_possession_occurred INTEGER NOT NULL,
    team_home_score                    INTEGER NOT NULL,
    team_visitor_score                 INTEGER NOT NULL,
    team_id                            INTEGER NOT NULL,
    team_abbreviation                  TEXT    NOT NULL,
    PRIMARY KEY (play_id, entry)
);

CREATE TABLE IF NOT EXISTS drives (
    year                   INTEGER NOT NULL,
    game_id                INTEGER NOT NULL,
    play_id                INTEGER NOT NULL,
    play_sequence          INTEGER NOT NULL,
    entry                  INTEGER NOT NULL,
    home                   INTEGER NOT NULL,
    won                    INTEGER NOT NULL,
    drive_id               INTEGER NOT NULL,
    drive_sequence         INTEGER NOT NULL,
    last_play              INTEGER NOT NULL,
    points_scored          INTEGER NOT NULL,
    points_scored_on_drive INTEGER NOT NULL,
    kickoff                INTEGER NOT NULL,
    conv1                  INTEGER NOT NULL,
    conv2                  INTEGER NOT NULL,
    regular                INTEGER NOT NULL,
    distance               INTEGER,
    score_diff             INTEGER NOT NULL,
    score_diff_calc        REAL    NOT NULL,
    total_score            INTEGER NOT NULL,
    time_remaining         INTEGER,
    down                   INTEGER,
    yards_to_go            INTEGER,
    ot                     INTEGER NOT NULL,
    quarter                INTEGER NOT NULL,
    PRIMARY KEY (play_id, entry)
);

CREATE TABLE IF NOT EXISTS epa (
    year          INTEGER NOT NULL,
    game_id       INTEGER NOT NULL,
    play_id       INTEGER NOT NULL,
    play_sequence INTEGER NOT NULL,
    entry         INTEGER NOT NULL,
    ep            REAL,
    epa           REAL,
    team_1_ep     REAL,
    team_2_ep     REAL,
    team_1_epa    REAL,
    team_2_epa    REAL,
    wp            REAL,
    wpa           REAL,
    team_1_wp     REAL,
    team_2_wp     REAL,
    team_1_wpa    REAL,
    team_2_wpa    REAL,
    PRIMARY KEY (play_id, entry)
);

CREATE TABLE IF NOT EXISTS elo (
    year                     INTEGER NOT NULL,
    game_id                  INTEGER PRIMARY KEY,
    team_1_team_id           INTEGER NOT NULL,
    team_2_team_id           INTEGER NOT NULL,
    team_1_elo_season_in     REAL    NOT NULL,
    team_1_elo_season_out    REAL    NOT NULL,
    team_2_elo_season_in     REAL    NOT NULL,
    team_2_elo_season_out    REAL    NOT NULL,
    team_1_elo_franchise_in  REAL    NOT NULL,
    team_1_elo_franchise_out REAL    NOT NULL,
    team_2_elo_franchise_in  REAL    NOT NULL,
    team_2_elo_franchise_out REAL    NOT NULL
);

CREATE TABLE IF NOT EXISTS gei (
    year     INTEGER NOT NULL,
    game_id  INTEGER PRIMARY KEY,
    gei      REAL    NOT NULL,
    gsi      REAL    NOT NULL,
    cbf      REAL    NOT NULL,
    gei_pct  REAL    NOT NULL,
    gei_rank INTEGER NOT NULL,
    gsi_pct  REAL    NOT NULL,
    gsi_rank INTEGER NOT NULL,
    cbf_pct  REAL    NOT NULL,
    cbf_rank INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_games_year ON games(year);
CREATE INDEX IF NOT EXISTS idx_games_date ON games(date_start);
CREATE INDEX IF NOT EXISTS idx_pbp_game ON pbp(game_id);
CREATE INDEX IF NOT EXISTS idx_drives_game ON drives(game_id);
CREATE INDEX IF NOT EXISTS idx_epa_game ON epa(game_id);
CREATE INDEX IF NOT EXISTS idx_elo_teams ON elo(team_1_team_id, team_2_team_id);
"#;
