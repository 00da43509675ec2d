use crate::models::{ChannelRow, FavoriteRow, MessageRow, UserRow};
use crate::Database;
use anyhow::{anyhow, Result};
use rusqlite::Connection;

use fitchatly_types::channel::private_channel_id;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        username: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, username, name, password) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, email, username, name, password_hash),
            )?;
            Ok(())
        })
    }

    /// Whether any account already claims the email or the username.
    pub fn login_taken(&self, email: &str, username: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE email = ?1 OR username = ?2",
                (email, username),
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// `login` matches either the email or the username.
    pub fn find_user_by_login(&self, login: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_login(conn, login))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// Update display fields, leaving any field passed as `None` untouched.
    /// Returns the refreshed row, or `None` if the user does not exist.
    pub fn update_profile(
        &self,
        id: &str,
        name: Option<&str>,
        image: Option<&str>,
    ) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET name = COALESCE(?2, name), image = COALESCE(?3, image)
                 WHERE id = ?1",
                (id, name, image),
            )?;
            query_user_by_id(conn, id)
        })
    }

    // -- Channels --

    /// The channels one user may see: the public set plus the private
    /// channels addressed to them. Other users' private channels never
    /// appear here.
    pub fn list_channels_for(&self, user_id: &str) -> Result<Vec<ChannelRow>> {
        let own_private_prefix = format!("{}%", private_channel_id(user_id, ""));
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, kind, created_at FROM channels
                 WHERE kind = 'public' OR id LIKE ?1
                 ORDER BY id",
            )?;

            let rows = stmt
                .query_map([&own_private_prefix], |row| {
                    Ok(ChannelRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        kind: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn get_channel(&self, id: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| query_channel(conn, id))
    }

    /// Atomic create-if-absent-else-fetch. Concurrent first writers to the
    /// same channel both succeed; whoever loses the insert gets the winner's
    /// row back.
    pub fn create_channel_if_absent(&self, id: &str, name: &str, kind: &str) -> Result<ChannelRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO channels (id, name, kind) VALUES (?1, ?2, ?3)",
                (id, name, kind),
            )?;
            query_channel(conn, id)?.ok_or_else(|| anyhow!("Channel {} could not be created", id))
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        channel_id: &str,
        author_id: &str,
        content: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, channel_id, author_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, channel_id, author_id, content, created_at),
            )?;
            Ok(())
        })
    }

    /// The most recent `limit` messages of a channel in chronological order.
    /// `visible_authors`, when set, restricts rows to that author pair: for
    /// private channels, the requester plus the assistant identity.
    pub fn recent_messages(
        &self,
        channel_id: &str,
        limit: u32,
        visible_authors: Option<(&str, &str)>,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, channel_id, limit, visible_authors))
    }

    // -- Favorites --

    /// Idempotent add: at most one favorite row per (user, channel) pair.
    /// Re-adding returns the existing row.
    pub fn add_favorite(&self, id: &str, user_id: &str, channel_id: &str) -> Result<FavoriteRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO favorites (id, user_id, channel_id) VALUES (?1, ?2, ?3)",
                (id, user_id, channel_id),
            )?;
            query_favorite(conn, user_id, channel_id)?
                .ok_or_else(|| anyhow!("Favorite for channel {} could not be created", channel_id))
        })
    }

    /// Returns whether a row was actually removed.
    pub fn remove_favorite(&self, user_id: &str, channel_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM favorites WHERE user_id = ?1 AND channel_id = ?2",
                (user_id, channel_id),
            )?;
            Ok(removed > 0)
        })
    }

    pub fn list_favorites(&self, user_id: &str) -> Result<Vec<FavoriteRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, channel_id, created_at FROM favorites
                 WHERE user_id = ?1 ORDER BY created_at",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(FavoriteRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        channel_id: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        name: row.get(3)?,
        image: row.get(4)?,
        password: row.get(5)?,
        role: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const USER_COLUMNS: &str = "id, email, username, name, image, password, role, created_at";

fn query_user_by_login(conn: &Connection, login: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ?1 OR username = ?1"
    ))?;

    let row = stmt.query_row([login], user_from_row).optional()?;

    Ok(row)
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;

    let row = stmt.query_row([id], user_from_row).optional()?;

    Ok(row)
}

fn query_channel(conn: &Connection, id: &str) -> Result<Option<ChannelRow>> {
    let mut stmt =
        conn.prepare("SELECT id, name, kind, created_at FROM channels WHERE id = ?1")?;

    let row = stmt
        .query_row([id], |row| {
            Ok(ChannelRow {
                id: row.get(0)?,
                name: row.get(1)?,
                kind: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_messages(
    conn: &Connection,
    channel_id: &str,
    limit: u32,
    visible_authors: Option<(&str, &str)>,
) -> Result<Vec<MessageRow>> {
    // JOIN users to fetch author display fields in a single query
    let mut rows = match visible_authors {
        Some((first, second)) => {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.channel_id, m.author_id, u.name, u.image, m.content, m.created_at
                 FROM messages m
                 LEFT JOIN users u ON m.author_id = u.id
                 WHERE m.channel_id = ?1 AND m.author_id IN (?3, ?4)
                 ORDER BY m.created_at DESC
                 LIMIT ?2",
            )?;
            stmt.query_map(
                rusqlite::params![channel_id, limit, first, second],
                message_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.channel_id, m.author_id, u.name, u.image, m.content, m.created_at
                 FROM messages m
                 LEFT JOIN users u ON m.author_id = u.id
                 WHERE m.channel_id = ?1
                 ORDER BY m.created_at DESC
                 LIMIT ?2",
            )?;
            stmt.query_map(rusqlite::params![channel_id, limit], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    // Fetched newest-first to apply the limit; callers get chronological order.
    rows.reverse();
    Ok(rows)
}

fn message_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<MessageRow, rusqlite::Error> {
    Ok(MessageRow {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        author_id: row.get(2)?,
        author_name: row.get(3)?,
        author_image: row.get(4)?,
        content: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn query_favorite(
    conn: &Connection,
    user_id: &str,
    channel_id: &str,
) -> Result<Option<FavoriteRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, channel_id, created_at FROM favorites
         WHERE user_id = ?1 AND channel_id = ?2",
    )?;

    let row = stmt
        .query_row((user_id, channel_id), |row| {
            Ok(FavoriteRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                channel_id: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
