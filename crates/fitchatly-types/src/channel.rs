//! Channel identifier scheme.
//!
//! Public channels come from a small seeded set. Private assistant channels
//! are addressed by a deterministic composite identifier so the client can
//! reach a channel before its row exists; a channel is classified private
//! purely by this prefix, never by looking anything up.

/// Prefix shared by every private assistant channel identifier.
pub const PRIVATE_CHANNEL_PREFIX: &str = "private-";

/// Compose the private channel identifier for one user and one assistant
/// type. Pure string composition: the same inputs always produce the same
/// identifier, and both the client and the server derive it independently.
pub fn private_channel_id(user_id: &str, assistant_type: &str) -> String {
    format!("{PRIVATE_CHANNEL_PREFIX}{user_id}-{assistant_type}")
}

/// Whether an identifier falls in the private namespace. Holds regardless of
/// whether a channel row has been materialized yet.
pub fn is_private_channel(channel_id: &str) -> bool {
    channel_id.starts_with(PRIVATE_CHANNEL_PREFIX)
}

/// The assistant flavors offered in the sidebar. Each resolves to its own
/// private channel per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantKind {
    Personal,
    Strength,
    Nutrition,
    Cardio,
}

impl AssistantKind {
    pub const ALL: [AssistantKind; 4] = [
        AssistantKind::Personal,
        AssistantKind::Strength,
        AssistantKind::Nutrition,
        AssistantKind::Cardio,
    ];

    /// The assistant-type component of the channel identifier.
    pub fn slug(self) -> &'static str {
        match self {
            AssistantKind::Personal => "personal",
            AssistantKind::Strength => "strength",
            AssistantKind::Nutrition => "nutrition",
            AssistantKind::Cardio => "cardio",
        }
    }

    /// Name shown in the channel list.
    pub fn display_name(self) -> &'static str {
        match self {
            AssistantKind::Personal => "gpt-personal",
            AssistantKind::Strength => "gpt-strength",
            AssistantKind::Nutrition => "gpt-nutrition",
            AssistantKind::Cardio => "gpt-cardio",
        }
    }

    pub fn channel_id(self, user_id: &str) -> String {
        private_channel_id(user_id, self.slug())
    }
}

/// The per-user assistant channel list: (channel id, display name) pairs.
pub fn assistant_channels(user_id: &str) -> Vec<(String, &'static str)> {
    AssistantKind::ALL
        .iter()
        .map(|kind| (kind.channel_id(user_id), kind.display_name()))
        .collect()
}
