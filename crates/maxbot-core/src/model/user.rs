use serde::{Deserialize, Serialize};

/// A platform user or bot account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Numeric user ID. Some payloads name this field `id`.
    #[serde(alias = "id")]
    pub user_id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Display name, deprecated upstream in favour of first/last name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
    /// Last activity time in milliseconds since the Unix epoch.
    #[serde(default)]
    pub last_activity_time: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub full_avatar_url: Option<String>,
    /// Commands advertised by a bot account.
    #[serde(default)]
    pub commands: Option<Vec<BotCommand>>,
}

impl User {
    /// Returns the best human-readable name for this user.
    pub fn display_name(&self) -> String {
        if self.first_name.is_empty() {
            return self
                .name
                .clone()
                .or_else(|| self.username.clone())
                .unwrap_or_else(|| self.user_id.to_string());
        }
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// A command entry in a bot's command list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCommand {
    #[serde(default, alias = "command")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}
