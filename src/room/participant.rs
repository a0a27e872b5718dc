/// Label for a participant with neither a name nor an id
pub const FALLBACK_LABEL: &str = "Guest";

pub const LOCAL_LABEL: &str = "You";

/// Snapshot of one call participant as reported by the video SDK
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Participant {
    pub session_id: String,
    pub user_id: String,
    pub name: Option<String>,
    pub is_local: bool,
    pub has_video: bool,
    pub has_audio: bool,
    pub is_speaking: bool,
    pub is_screen_sharing: bool,
}

impl Participant {
    /// "You" for the local participant, else name, else id, else "Guest"
    pub fn display_name(&self) -> &str {
        if self.is_local {
            return LOCAL_LABEL;
        }
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name;
        }
        if !self.user_id.is_empty() {
            return &self.user_id;
        }
        FALLBACK_LABEL
    }

    /// Uppercased first character of the display name
    pub fn initial(&self) -> String {
        self.display_name()
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }
}
