pub const TICK_RATE: u32 = 60;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const TILE_SIZE: f32 = 30.0;

pub const PLAYER_SPEED: f32 = 2.0;
pub const PLAYER_POWER_SPEED_MULTIPLIER: f32 = 1.25;
pub const PLAYER_EATING_SLOWDOWN_MULTIPLIER: f32 = 0.5;
pub const PLAYER_EATING_SLOWDOWN_TICKS: u32 = 6;
pub const PLAYER_POWER_TICKS: u32 = 10 * TICK_RATE;
pub const PLAYER_TURN_TOLERANCE: f32 = 6.0;
pub const PLAYER_START_LIVES: u32 = 3;

pub const GHOST_SPEED: f32 = 2.0;
pub const GHOST_FRIGHTENED_SPEED: f32 = 1.0;
pub const GHOST_EATEN_SPEED: f32 = 4.0;
pub const GHOST_TURN_TOLERANCE: f32 = 2.0;
pub const GHOST_FRIGHTENED_TICKS: u32 = 600;
pub const TUNNEL_SPEED_MULTIPLIER: f32 = 0.4;
pub const HOUSE_EXIT_TOLERANCE: f32 = 2.0;

pub const AMBUSH_TILES_AHEAD: i32 = 4;
pub const FLANK_OFFSET_TILES: i32 = 2;
pub const CONDITIONAL_THRESHOLD_TILES: f32 = 8.0;

pub const COLLECT_TOLERANCE: f32 = 5.0;
pub const HITBOX_RADIUS: f32 = TILE_SIZE / 2.0 * 0.8;

pub const SCORE_COLLECTIBLE: u32 = 10;
pub const SCORE_BIG_COLLECTIBLE: u32 = 50;
pub const SCORE_GHOST_EATEN: u32 = 200;

pub fn ticks_from_seconds(seconds: u32) -> u64 {
    seconds as u64 * TICK_RATE as u64
}
