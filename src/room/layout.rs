//! Grid or screen-share layout derived from a participant snapshot
//!
//! Derivation is pure and holds no state, so it is recomputed on every
//! participant change.

use std::collections::HashSet;

use super::participant::Participant;

/// One rendered participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub session_id: String,
    pub user_id: String,
    pub label: String,
    pub initial: String,
    /// Video stream shown instead of the initial avatar
    pub show_video: bool,
    pub muted_badge: bool,
    pub camera_off_badge: bool,
    /// Speaking ring, only when audio is present
    pub speaking: bool,
}

impl From<&Participant> for Tile {
    fn from(p: &Participant) -> Self {
        Self {
            session_id: p.session_id.clone(),
            user_id: p.user_id.clone(),
            label: p.display_name().to_string(),
            initial: p.initial(),
            show_video: p.has_video,
            muted_badge: !p.has_audio,
            camera_off_badge: !p.has_video,
            speaking: p.is_speaking && p.has_audio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// Even grid of every participant
    Grid { tiles: Vec<Tile> },
    /// First sharer full-size with a thumbnail strip of everyone
    ScreenShare {
        presenter: Tile,
        thumbnails: Vec<Tile>,
    },
}

impl Layout {
    pub fn tile_count(&self) -> usize {
        match self {
            Layout::Grid { tiles } => tiles.len(),
            Layout::ScreenShare { thumbnails, .. } => thumbnails.len(),
        }
    }

    /// Distinct participants represented in the layout
    pub fn participant_count(&self) -> usize {
        self.tile_count()
    }

    pub fn presenter(&self) -> Option<&Tile> {
        match self {
            Layout::Grid { .. } => None,
            Layout::ScreenShare { presenter, .. } => Some(presenter),
        }
    }

    pub fn tiles(&self) -> &[Tile] {
        match self {
            Layout::Grid { tiles } => tiles,
            Layout::ScreenShare { thumbnails, .. } => thumbnails,
        }
    }
}

/// Drops repeated user ids (first occurrence wins) and anonymous entries
pub fn dedupe(participants: &[Participant]) -> Vec<&Participant> {
    let mut seen = HashSet::new();
    participants
        .iter()
        .filter(|p| !p.user_id.is_empty() && seen.insert(p.user_id.as_str()))
        .collect()
}

pub fn derive_layout(participants: &[Participant]) -> Layout {
    let unique = dedupe(participants);
    let tiles: Vec<Tile> = unique.iter().map(|p| Tile::from(*p)).collect();

    match unique.iter().position(|p| p.is_screen_sharing) {
        Some(index) => Layout::ScreenShare {
            presenter: tiles[index].clone(),
            thumbnails: tiles,
        },
        None => Layout::Grid { tiles },
    }
}

/// Meeting clock as `MM:SS`; minutes keep counting past an hour
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
