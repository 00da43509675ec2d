use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

use fitchatly_types::assistant::{ASSISTANT_NAME, ASSISTANT_ROLE, ASSISTANT_USER_ID};

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT UNIQUE,
            username    TEXT UNIQUE,
            name        TEXT,
            image       TEXT,
            password    TEXT,
            role        TEXT NOT NULL DEFAULT 'user',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS channels (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL UNIQUE,
            kind        TEXT NOT NULL CHECK (kind IN ('public', 'private')),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            channel_id  TEXT NOT NULL REFERENCES channels(id),
            author_id   TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_channel
            ON messages(channel_id, created_at);

        CREATE TABLE IF NOT EXISTS favorites (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            channel_id  TEXT NOT NULL REFERENCES channels(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, channel_id)
        );

        -- Seed the fixed public channel set
        INSERT OR IGNORE INTO channels (id, name, kind) VALUES
            ('c1', 'general', 'public'),
            ('c2', 'help', 'public'),
            ('c3', 'random', 'public'),
            ('c4', 'running', 'public'),
            ('c5', 'weighttraining', 'public'),
            ('c6', 'rockclimbing', 'public'),
            ('c7', 'calisthenics', 'public');
        ",
    )?;

    // Seed the reserved assistant identity that authors every generated
    // reply. Not a real account: no email, no username, no password.
    conn.execute(
        "INSERT OR IGNORE INTO users (id, name, role) VALUES (?1, ?2, ?3)",
        (ASSISTANT_USER_ID, ASSISTANT_NAME, ASSISTANT_ROLE),
    )?;

    info!("Database migrations complete");
    Ok(())
}
