use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-side handle for one live connection. Distinct from any
/// persistent user account.
pub type SessionId = Uuid;

/// Display names longer than this are truncated on join.
pub const MAX_USERNAME_LEN: usize = 32;

/// Tile coordinates where a newly admitted player appears.
pub const SPAWN_X: f64 = 19.0;
pub const SPAWN_Y: f64 = 13.0;

/// Facing direction of a player sprite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

/// A player inside a room, owned by that room for its lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub session_id: SessionId,
    pub username: String,
    pub x: f64,
    pub y: f64,
    pub dir: Direction,
    pub frame: u32,
    pub has_sword: bool,
}

impl Player {
    /// Create a player at the spawn point with default state.
    pub fn spawn(session_id: SessionId, username: &str) -> Self {
        Self {
            session_id,
            username: sanitize_username(username),
            x: SPAWN_X,
            y: SPAWN_Y,
            dir: Direction::default(),
            frame: 0,
            has_sword: true,
        }
    }

    /// Merge a partial update into this player. Fields absent from the
    /// update keep their previous value.
    pub fn apply(&mut self, update: &PlayerUpdate) {
        if let Some(x) = update.x {
            self.x = x;
        }
        if let Some(y) = update.y {
            self.y = y;
        }
        if let Some(dir) = update.dir {
            self.dir = dir;
        }
        if let Some(frame) = update.frame {
            self.frame = frame;
        }
        if let Some(has_sword) = update.has_sword {
            self.has_sword = has_sword;
        }
    }
}

/// Partial player state as sent by clients. Also the wire payload of the
/// player-update message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub dir: Option<Direction>,
    pub frame: Option<u32>,
    pub has_sword: Option<bool>,
}

/// Trim, cap at [`MAX_USERNAME_LEN`] characters, fall back to "Guest"
/// when nothing is left.
pub fn sanitize_username(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "Guest".to_string();
    }
    trimmed.chars().take(MAX_USERNAME_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_uses_defaults() {
        let id = Uuid::new_v4();
        let p = Player::spawn(id, "Alice");
        assert_eq!(p.session_id, id);
        assert_eq!(p.username, "Alice");
        assert!((p.x - SPAWN_X).abs() < f64::EPSILON);
        assert!((p.y - SPAWN_Y).abs() < f64::EPSILON);
        assert_eq!(p.dir, Direction::Down);
        assert_eq!(p.frame, 0);
        assert!(p.has_sword);
    }

    #[test]
    fn apply_merges_only_present_fields() {
        let mut p = Player::spawn(Uuid::new_v4(), "Alice");
        p.apply(&PlayerUpdate {
            y: Some(7.0),
            ..PlayerUpdate::default()
        });
        p.apply(&PlayerUpdate {
            x: Some(5.0),
            ..PlayerUpdate::default()
        });
        assert!((p.x - 5.0).abs() < f64::EPSILON);
        assert!((p.y - 7.0).abs() < f64::EPSILON);
        assert_eq!(p.dir, Direction::Down);
        assert_eq!(p.frame, 0);
        assert!(p.has_sword);
    }

    #[test]
    fn apply_overwrites_all_fields_when_present() {
        let mut p = Player::spawn(Uuid::new_v4(), "Alice");
        p.apply(&PlayerUpdate {
            x: Some(1.0),
            y: Some(2.0),
            dir: Some(Direction::Left),
            frame: Some(3),
            has_sword: Some(false),
        });
        assert_eq!(p.dir, Direction::Left);
        assert_eq!(p.frame, 3);
        assert!(!p.has_sword);
    }

    #[test]
    fn username_sanitization() {
        assert_eq!(sanitize_username("  Bob  "), "Bob");
        assert_eq!(sanitize_username(""), "Guest");
        assert_eq!(sanitize_username("   "), "Guest");
        let long = "x".repeat(100);
        assert_eq!(sanitize_username(&long).chars().count(), MAX_USERNAME_LEN);
    }

    #[test]
    fn direction_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Direction::Down).unwrap(), "\"down\"");
        assert_eq!(serde_json::to_string(&Direction::Left).unwrap(), "\"left\"");
    }
}
