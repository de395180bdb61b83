use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("maze layout is empty")]
    EmptyLayout,

    #[error("maze row {row} has width {found}, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("unknown cell glyph {glyph:?} at ({x},{y})")]
    UnknownGlyph { glyph: char, x: usize, y: usize },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("{what} at tile ({x},{y}) is not walkable")]
    BlockedPoint { what: String, x: i32, y: i32 },

    #[error("tunnel row {row} is outside the maze height {height}")]
    TunnelRowOutOfRange { row: i32, height: i32 },

    #[error("mode schedule is invalid: {0}")]
    Schedule(String),

    #[error("ghost {ghost} references peer {peer}, which is not a valid other ghost")]
    InvalidPeer { ghost: usize, peer: usize },

    #[error("ghost {ghost} waits for {threshold} collectibles but the maze holds {available}")]
    UnreachableRelease {
        ghost: usize,
        threshold: u32,
        available: usize,
    },

    #[error("level defines no ghosts")]
    NoGhosts,

    #[error("player must start with at least one life")]
    NoLives,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
