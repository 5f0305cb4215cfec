//! SQL schema for the Bayesball SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS leagues (
    league_id    INTEGER PRIMARY KEY,
    name         TEXT NOT NULL,
    kind         TEXT NOT NULL,   -- 'league' | 'cup'
    logo         TEXT,
    country_name TEXT NOT NULL,
    country_code TEXT,
    country_flag TEXT
);

-- Seasons are never deleted. Freshness timestamps only move forward.
-- Timestamps are fixed-width RFC 3339 UTC strings, so text order is
-- chronological order.
CREATE TABLE IF NOT EXISTS seasons (
    league_id                 INTEGER NOT NULL,
    season_year               INTEGER NOT NULL,
    start_date                TEXT    NOT NULL,   -- YYYY-MM-DD
    end_date                  TEXT    NOT NULL,   -- YYYY-MM-DD
    is_current                INTEGER NOT NULL,
    last_updated_teams        TEXT    NOT NULL,
    last_updated_fixtures     TEXT    NOT NULL,
    last_updated_posteriors   TEXT    NOT NULL,
    newest_finished_at        TEXT,
    data_need_to_update       INTEGER NOT NULL,
    posteriors_need_to_update INTEGER NOT NULL,
    discovered_at             TEXT    NOT NULL,
    PRIMARY KEY (league_id, season_year)
);

-- Staleness selection: partition on the flag, range over the timestamp,
-- key columns for a deterministic tie-break.
CREATE INDEX IF NOT EXISTS seasons_staleness_idx
    ON seasons (data_need_to_update, last_updated_fixtures, league_id, season_year);

CREATE INDEX IF NOT EXISTS seasons_posteriors_idx
    ON seasons (posteriors_need_to_update)
    WHERE posteriors_need_to_update = 1;

PRAGMA user_version = 1;
";
