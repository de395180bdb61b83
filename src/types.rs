use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    // Fixed evaluation order for direction choice; earlier entries win ties.
    pub const CARDINALS: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn vector(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::None => (0, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::None => Self::None,
        }
    }

    pub fn is_opposite(self, other: Direction) -> bool {
        self != Self::None && other == self.opposite()
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(self, dir: Direction, amount: f32) -> Position {
        let (dx, dy) = dir.vector();
        Position {
            x: self.x + dx as f32 * amount,
            y: self.y + dy as f32 * amount,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction) -> GridPos {
        let (dx, dy) = dir.vector();
        GridPos {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Wall,
    Open,
    Collectible,
    BigCollectible,
}

impl CellKind {
    pub fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '#' => Some(Self::Wall),
            ' ' => Some(Self::Open),
            '.' => Some(Self::Collectible),
            'o' => Some(Self::BigCollectible),
            _ => None,
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Self::Wall => '#',
            Self::Open => ' ',
            Self::Collectible => '.',
            Self::BigCollectible => 'o',
        }
    }

    pub fn is_collectible(self) -> bool {
        matches!(self, Self::Collectible | Self::BigCollectible)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalMode {
    Scatter,
    Chase,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorMode {
    Scatter,
    Chase,
    Frightened,
    Eaten,
}

impl From<GlobalMode> for BehaviorMode {
    fn from(mode: GlobalMode) -> Self {
        match mode {
            GlobalMode::Scatter => Self::Scatter,
            GlobalMode::Chase => Self::Chase,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostHouseState {
    InHouse,
    Exiting,
    Active,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    DirectChaser,
    Ambusher,
    Flanking,
    Conditional,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    OutOfLives,
    LevelCleared,
}

#[derive(Clone, Debug, Serialize)]
pub struct WorldInit {
    pub width: i32,
    pub height: i32,
    #[serde(rename = "tileSize")]
    pub tile_size: f32,
    #[serde(rename = "tunnelRow")]
    pub tunnel_row: Option<i32>,
    pub tiles: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub x: f32,
    pub y: f32,
    pub dir: Direction,
    #[serde(rename = "nextDir")]
    pub next_dir: Direction,
    pub speed: f32,
    pub score: u32,
    pub lives: u32,
    #[serde(rename = "powerTicks")]
    pub power_ticks: u32,
    #[serde(rename = "animPhase")]
    pub anim_phase: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct GhostView {
    pub id: usize,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub dir: Direction,
    pub mode: BehaviorMode,
    #[serde(rename = "houseState")]
    pub house_state: GhostHouseState,
    pub strategy: StrategyKind,
    pub target: Option<Position>,
    #[serde(rename = "frightenedTicks")]
    pub frightened_ticks: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    CollectibleEaten {
        x: i32,
        y: i32,
        big: bool,
    },
    GhostReleased {
        #[serde(rename = "ghostId")]
        ghost_id: usize,
    },
    GhostsFrightened,
    GhostEaten {
        #[serde(rename = "ghostId")]
        ghost_id: usize,
    },
    GhostLeftHouse {
        #[serde(rename = "ghostId")]
        ghost_id: usize,
    },
    GhostRespawned {
        #[serde(rename = "ghostId")]
        ghost_id: usize,
    },
    ModeChanged {
        mode: GlobalMode,
    },
    PlayerDied {
        #[serde(rename = "livesLeft")]
        lives_left: u32,
    },
    GameOver {
        reason: GameOverReason,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub mode: GlobalMode,
    #[serde(rename = "remainingCollectibles")]
    pub remaining_collectibles: usize,
    pub player: PlayerView,
    pub ghosts: Vec<GhostView>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameSummary {
    pub reason: Option<GameOverReason>,
    pub ticks: u64,
    pub score: u32,
    pub lives: u32,
    #[serde(rename = "collectiblesEaten")]
    pub collectibles_eaten: u32,
    #[serde(rename = "ghostsEaten")]
    pub ghosts_eaten: u32,
    #[serde(rename = "remainingCollectibles")]
    pub remaining_collectibles: usize,
}
