use std::path::Path;

use serde::Deserialize;

use crate::constants::{
    ticks_from_seconds, AMBUSH_TILES_AHEAD, COLLECT_TOLERANCE, CONDITIONAL_THRESHOLD_TILES,
    FLANK_OFFSET_TILES, GHOST_EATEN_SPEED, GHOST_FRIGHTENED_SPEED, GHOST_FRIGHTENED_TICKS,
    GHOST_SPEED, GHOST_TURN_TOLERANCE, HITBOX_RADIUS, HOUSE_EXIT_TOLERANCE,
    PLAYER_EATING_SLOWDOWN_MULTIPLIER, PLAYER_EATING_SLOWDOWN_TICKS,
    PLAYER_POWER_SPEED_MULTIPLIER, PLAYER_POWER_TICKS, PLAYER_SPEED, PLAYER_START_LIVES,
    PLAYER_TURN_TOLERANCE, SCORE_BIG_COLLECTIBLE, SCORE_COLLECTIBLE, SCORE_GHOST_EATEN,
    TILE_SIZE, TUNNEL_SPEED_MULTIPLIER,
};
use crate::error::ConfigError;
use crate::grid::GridMap;
use crate::types::{GlobalMode, GridPos, Position};

// The house door below the exit is walled; ghosts leave by homing on the exit.
const CLASSIC_LAYOUT: [&str; 22] = [
    "###################",
    "#o.......#.......o#",
    "#.##.###.#.###.##.#",
    "#.##.###.#.###.##.#",
    "#.................#",
    "#.##.#.#####.#.##.#",
    "#....#...#...#....#",
    "####.### # ###.####",
    "####.#       #.####",
    "####.# ##### #.####",
    "    .  #   #  .    ",
    "####.# ##### #.####",
    "####.#       #.####",
    "####.#.#####.#.####",
    "#........#........#",
    "#.##.###.#.###.##.#",
    "#o.#..... .....#.o#",
    "##.#.#.#####.#.#.##",
    "#....#...#...#....#",
    "#.######.#.######.#",
    "#.................#",
    "###################",
];

const CLASSIC_TUNNEL_ROW: i32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct TilePoint {
    pub x: f32,
    pub y: f32,
}

impl TilePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn to_pixels(self, tile_size: f32) -> Position {
        Position::new(self.x * tile_size, self.y * tile_size)
    }

    fn tile(self) -> GridPos {
        GridPos::new(self.x.floor() as i32, self.y.floor() as i32)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    DirectChaser,
    Ambusher {
        #[serde(default = "default_ambush_tiles")]
        tiles_ahead: i32,
    },
    Flanking {
        #[serde(default = "default_flank_tiles")]
        offset_tiles: i32,
        peer: usize,
    },
    Conditional {
        #[serde(default = "default_conditional_threshold")]
        threshold_tiles: f32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseTrigger {
    Ticks(u64),
    Collectibles(u32),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GhostConfig {
    pub name: String,
    pub strategy: StrategyConfig,
    pub spawn: TilePoint,
    pub scatter_corner: GridPos,
    #[serde(default = "default_true")]
    pub starts_in_house: bool,
    pub release: ReleaseTrigger,
}

// `ticks: None` marks the final, never-ending phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct ModePhase {
    pub mode: GlobalMode,
    pub ticks: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    pub player: f32,
    pub player_power_multiplier: f32,
    pub player_eating_multiplier: f32,
    pub ghost: f32,
    pub ghost_frightened: f32,
    pub ghost_eaten: f32,
    pub tunnel_multiplier: f32,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            player: PLAYER_SPEED,
            player_power_multiplier: PLAYER_POWER_SPEED_MULTIPLIER,
            player_eating_multiplier: PLAYER_EATING_SLOWDOWN_MULTIPLIER,
            ghost: GHOST_SPEED,
            ghost_frightened: GHOST_FRIGHTENED_SPEED,
            ghost_eaten: GHOST_EATEN_SPEED,
            tunnel_multiplier: TUNNEL_SPEED_MULTIPLIER,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    pub frightened_ticks: u32,
    pub power_ticks: u32,
    pub eating_slowdown_ticks: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            frightened_ticks: GHOST_FRIGHTENED_TICKS,
            power_ticks: PLAYER_POWER_TICKS,
            eating_slowdown_ticks: PLAYER_EATING_SLOWDOWN_TICKS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    pub player_turn: f32,
    pub ghost_turn: f32,
    pub collect: f32,
    pub house_exit: f32,
    pub hitbox_radius: f32,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            player_turn: PLAYER_TURN_TOLERANCE,
            ghost_turn: GHOST_TURN_TOLERANCE,
            collect: COLLECT_TOLERANCE,
            house_exit: HOUSE_EXIT_TOLERANCE,
            hitbox_radius: HITBOX_RADIUS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    pub collectible: u32,
    pub big_collectible: u32,
    pub ghost_eaten: u32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            collectible: SCORE_COLLECTIBLE,
            big_collectible: SCORE_BIG_COLLECTIBLE,
            ghost_eaten: SCORE_GHOST_EATEN,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub tile_size: f32,
    pub layout: Vec<String>,
    pub tunnel_row: Option<i32>,
    pub player_spawn: TilePoint,
    pub house_exit: TilePoint,
    pub ghosts: Vec<GhostConfig>,
    pub mode_schedule: Vec<ModePhase>,
    pub lives: u32,
    pub speeds: SpeedConfig,
    pub timers: TimerConfig,
    pub tolerances: ToleranceConfig,
    pub scoring: ScoreConfig,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            layout: CLASSIC_LAYOUT.iter().map(|row| row.to_string()).collect(),
            tunnel_row: Some(CLASSIC_TUNNEL_ROW),
            player_spawn: TilePoint::new(9.5, 16.5),
            house_exit: TilePoint::new(9.5, 8.5),
            ghosts: classic_ghosts(CLASSIC_LAYOUT.len() as i32),
            mode_schedule: classic_schedule(),
            lives: PLAYER_START_LIVES,
            speeds: SpeedConfig::default(),
            timers: TimerConfig::default(),
            tolerances: ToleranceConfig::default(),
            scoring: ScoreConfig::default(),
        }
    }
}

impl LevelConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn build_grid(&self) -> Result<GridMap, ConfigError> {
        let grid = GridMap::from_rows(&self.layout, self.tile_size, self.tunnel_row)?;

        self.check_positive()?;
        if self.lives == 0 {
            return Err(ConfigError::NoLives);
        }
        if self.ghosts.is_empty() {
            return Err(ConfigError::NoGhosts);
        }

        check_walkable(&grid, "player spawn", self.player_spawn)?;
        check_walkable(&grid, "house exit", self.house_exit)?;
        for (idx, ghost) in self.ghosts.iter().enumerate() {
            check_walkable(&grid, &format!("spawn of ghost {idx} ({})", ghost.name), ghost.spawn)?;
            if let StrategyConfig::Flanking { peer, .. } = ghost.strategy {
                if peer == idx || peer >= self.ghosts.len() {
                    return Err(ConfigError::InvalidPeer { ghost: idx, peer });
                }
            }
            if let ReleaseTrigger::Collectibles(threshold) = ghost.release {
                if threshold as usize > grid.remaining_collectibles() {
                    return Err(ConfigError::UnreachableRelease {
                        ghost: idx,
                        threshold,
                        available: grid.remaining_collectibles(),
                    });
                }
            }
        }

        self.check_schedule()?;
        Ok(grid)
    }

    fn check_positive(&self) -> Result<(), ConfigError> {
        let fields = [
            ("speeds.player", self.speeds.player),
            ("speeds.player_power_multiplier", self.speeds.player_power_multiplier),
            ("speeds.player_eating_multiplier", self.speeds.player_eating_multiplier),
            ("speeds.ghost", self.speeds.ghost),
            ("speeds.ghost_frightened", self.speeds.ghost_frightened),
            ("speeds.ghost_eaten", self.speeds.ghost_eaten),
            ("speeds.tunnel_multiplier", self.speeds.tunnel_multiplier),
            ("tolerances.hitbox_radius", self.tolerances.hitbox_radius),
        ];
        for (field, value) in fields {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        Ok(())
    }

    fn check_schedule(&self) -> Result<(), ConfigError> {
        let Some(last) = self.mode_schedule.last() else {
            return Err(ConfigError::Schedule("schedule is empty".to_string()));
        };
        if last.ticks.is_some() {
            return Err(ConfigError::Schedule(
                "final phase must be open-ended".to_string(),
            ));
        }
        let head = &self.mode_schedule[..self.mode_schedule.len() - 1];
        let mut total = 0u64;
        for (idx, phase) in head.iter().enumerate() {
            match phase.ticks {
                None => {
                    return Err(ConfigError::Schedule(format!(
                        "phase {idx} is open-ended but is not the last phase"
                    )))
                }
                Some(0) => {
                    return Err(ConfigError::Schedule(format!("phase {idx} lasts zero ticks")))
                }
                Some(len) => {
                    total = total.checked_add(len).ok_or_else(|| {
                        ConfigError::Schedule(format!("phase {idx} overflows the tick counter"))
                    })?;
                }
            }
        }
        Ok(())
    }
}

fn check_walkable(grid: &GridMap, what: &str, point: TilePoint) -> Result<(), ConfigError> {
    let tile = point.tile();
    if !grid.in_bounds(tile.x, tile.y) || !grid.is_walkable_at(tile) {
        return Err(ConfigError::BlockedPoint {
            what: what.to_string(),
            x: tile.x,
            y: tile.y,
        });
    }
    Ok(())
}

fn classic_ghosts(height: i32) -> Vec<GhostConfig> {
    vec![
        GhostConfig {
            name: "Blinky".to_string(),
            strategy: StrategyConfig::DirectChaser,
            spawn: TilePoint::new(9.5, 8.5),
            scatter_corner: GridPos::new(17, 0),
            starts_in_house: true,
            release: ReleaseTrigger::Ticks(0),
        },
        GhostConfig {
            name: "Pinky".to_string(),
            strategy: StrategyConfig::Ambusher {
                tiles_ahead: AMBUSH_TILES_AHEAD,
            },
            spawn: TilePoint::new(8.5, 10.5),
            scatter_corner: GridPos::new(1, 0),
            starts_in_house: true,
            release: ReleaseTrigger::Ticks(60),
        },
        GhostConfig {
            name: "Inky".to_string(),
            strategy: StrategyConfig::Flanking {
                offset_tiles: FLANK_OFFSET_TILES,
                peer: 0,
            },
            spawn: TilePoint::new(9.5, 10.5),
            scatter_corner: GridPos::new(17, height - 1),
            starts_in_house: true,
            release: ReleaseTrigger::Collectibles(30),
        },
        GhostConfig {
            name: "Clyde".to_string(),
            strategy: StrategyConfig::Conditional {
                threshold_tiles: CONDITIONAL_THRESHOLD_TILES,
            },
            spawn: TilePoint::new(10.5, 10.5),
            scatter_corner: GridPos::new(1, height - 2),
            starts_in_house: true,
            release: ReleaseTrigger::Collectibles(60),
        },
    ]
}

fn classic_schedule() -> Vec<ModePhase> {
    let phase = |mode, seconds| ModePhase {
        mode,
        ticks: Some(ticks_from_seconds(seconds)),
    };
    vec![
        phase(GlobalMode::Scatter, 7),
        phase(GlobalMode::Chase, 20),
        phase(GlobalMode::Scatter, 7),
        phase(GlobalMode::Chase, 20),
        phase(GlobalMode::Scatter, 5),
        phase(GlobalMode::Chase, 20),
        phase(GlobalMode::Scatter, 5),
        ModePhase {
            mode: GlobalMode::Chase,
            ticks: None,
        },
    ]
}

fn default_ambush_tiles() -> i32 {
    AMBUSH_TILES_AHEAD
}

fn default_flank_tiles() -> i32 {
    FLANK_OFFSET_TILES
}

fn default_conditional_threshold() -> f32 {
    CONDITIONAL_THRESHOLD_TILES
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GameEngine;

    #[test]
    fn classic_level_is_valid() {
        let config = LevelConfig::default();
        let grid = config.build_grid().expect("classic level should validate");
        assert_eq!(grid.width(), 19);
        assert_eq!(grid.height(), 22);
        assert!(grid.remaining_collectibles() >= 60);
        assert!(grid.is_walkable(-1, CLASSIC_TUNNEL_ROW));
        assert!(!grid.is_walkable(-1, CLASSIC_TUNNEL_ROW - 1));
    }

    #[test]
    fn json_overrides_only_named_fields() {
        let config = LevelConfig::from_json_str(r#"{"lives":5,"speeds":{"ghost":3.0}}"#)
            .expect("partial level should parse");
        assert_eq!(config.lives, 5);
        assert_eq!(config.speeds.ghost, 3.0);
        assert_eq!(config.speeds.player, PLAYER_SPEED);
        assert_eq!(config.ghosts.len(), 4);
    }

    #[test]
    fn ghost_entries_parse_from_json() {
        let config = LevelConfig::from_json_str(
            r#"{"ghosts":[
                {"name":"A","strategy":{"kind":"direct_chaser"},"spawn":{"x":9.5,"y":8.5},
                 "scatter_corner":{"x":0,"y":0},"release":{"ticks":0}},
                {"name":"B","strategy":{"kind":"flanking","peer":0},"spawn":{"x":9.5,"y":10.5},
                 "scatter_corner":{"x":18,"y":21},"starts_in_house":false,"release":{"collectibles":5}}
            ]}"#,
        )
        .expect("ghost list should parse");
        assert_eq!(config.ghosts.len(), 2);
        assert_eq!(
            config.ghosts[1].strategy,
            StrategyConfig::Flanking {
                offset_tiles: FLANK_OFFSET_TILES,
                peer: 0
            }
        );
        assert!(config.ghosts[0].starts_in_house);
        assert!(!config.ghosts[1].starts_in_house);
        assert_eq!(config.ghosts[1].release, ReleaseTrigger::Collectibles(5));
        config.build_grid().expect("parsed level should validate");
    }

    #[test]
    fn invalid_peer_is_fatal() {
        let mut config = LevelConfig::default();
        config.ghosts[2].strategy = StrategyConfig::Flanking {
            offset_tiles: 2,
            peer: 2,
        };
        assert!(matches!(
            config.build_grid(),
            Err(ConfigError::InvalidPeer { ghost: 2, peer: 2 })
        ));
    }

    #[test]
    fn unreachable_release_is_fatal() {
        let mut config = LevelConfig::default();
        config.ghosts[3].release = ReleaseTrigger::Collectibles(10_000);
        assert!(matches!(
            config.build_grid(),
            Err(ConfigError::UnreachableRelease { ghost: 3, .. })
        ));
    }

    #[test]
    fn schedule_must_end_with_single_open_phase() {
        let mut config = LevelConfig::default();
        config.mode_schedule = vec![ModePhase {
            mode: GlobalMode::Chase,
            ticks: Some(10),
        }];
        assert!(matches!(config.build_grid(), Err(ConfigError::Schedule(_))));

        config.mode_schedule = vec![
            ModePhase {
                mode: GlobalMode::Scatter,
                ticks: None,
            },
            ModePhase {
                mode: GlobalMode::Chase,
                ticks: None,
            },
        ];
        assert!(matches!(config.build_grid(), Err(ConfigError::Schedule(_))));
    }

    #[test]
    fn schedule_longer_than_the_tick_counter_is_fatal() {
        let mut config = LevelConfig::default();
        config.mode_schedule = vec![
            ModePhase {
                mode: GlobalMode::Scatter,
                ticks: Some(10),
            },
            ModePhase {
                mode: GlobalMode::Chase,
                ticks: Some(u64::MAX),
            },
            ModePhase {
                mode: GlobalMode::Scatter,
                ticks: None,
            },
        ];
        assert!(matches!(config.build_grid(), Err(ConfigError::Schedule(_))));
        assert!(GameEngine::new(config, 1).is_err());
    }

    #[test]
    fn spawn_inside_wall_is_fatal() {
        let mut config = LevelConfig::default();
        config.player_spawn = TilePoint::new(0.5, 0.5);
        assert!(matches!(
            config.build_grid(),
            Err(ConfigError::BlockedPoint { x: 0, y: 0, .. })
        ));
    }

    #[test]
    fn missing_level_file_reports_io_error() {
        let path = std::env::temp_dir().join("maze-chase-missing-level/level.json");
        assert!(matches!(
            LevelConfig::from_json_file(&path),
            Err(ConfigError::Io(_))
        ));
    }
}
