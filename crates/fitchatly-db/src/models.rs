/// Database row types mapping directly to SQLite rows.
/// Distinct from fitchatly-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub password: Option<String>,
    pub role: String,
    pub created_at: String,
}

pub struct ChannelRow {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub channel_id: String,
    pub author_id: String,
    pub author_name: Option<String>,
    pub author_image: Option<String>,
    pub content: String,
    pub created_at: String,
}

pub struct FavoriteRow {
    pub id: String,
    pub user_id: String,
    pub channel_id: String,
    pub created_at: String,
}
