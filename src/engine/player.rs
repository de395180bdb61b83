use crate::config::LevelConfig;
use crate::engine::motion::{self, Turn};
use crate::grid::GridMap;
use crate::types::{Direction, PlayerView, Position};

const ANIM_PHASES: u32 = 4;

#[derive(Clone, Debug, PartialEq)]
pub struct PlayerTuning {
    pub speed: f32,
    pub power_multiplier: f32,
    pub eating_multiplier: f32,
    pub power_ticks: u32,
    pub eating_ticks: u32,
    pub turn_tolerance: f32,
}

impl PlayerTuning {
    pub fn from_config(config: &LevelConfig) -> Self {
        Self {
            speed: config.speeds.player,
            power_multiplier: config.speeds.player_power_multiplier,
            eating_multiplier: config.speeds.player_eating_multiplier,
            power_ticks: config.timers.power_ticks,
            eating_ticks: config.timers.eating_slowdown_ticks,
            turn_tolerance: config.tolerances.player_turn,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    position: Position,
    spawn: Position,
    dir: Direction,
    next_dir: Direction,
    score: u32,
    lives: u32,
    power_remaining: u32,
    eating_remaining: u32,
    collectibles_eaten: u32,
    ghosts_eaten: u32,
    anim_phase: u32,
    tuning: PlayerTuning,
}

impl Player {
    pub fn new(spawn: Position, lives: u32, tuning: PlayerTuning) -> Self {
        Self {
            position: spawn,
            spawn,
            dir: Direction::None,
            next_dir: Direction::None,
            score: 0,
            lives,
            power_remaining: 0,
            eating_remaining: 0,
            collectibles_eaten: 0,
            ghosts_eaten: 0,
            anim_phase: 0,
            tuning,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn direction(&self) -> Direction {
        self.dir
    }

    pub fn queued_direction(&self) -> Direction {
        self.next_dir
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn collectibles_eaten(&self) -> u32 {
        self.collectibles_eaten
    }

    pub fn ghosts_eaten(&self) -> u32 {
        self.ghosts_eaten
    }

    pub fn power_remaining(&self) -> u32 {
        self.power_remaining
    }

    pub fn queue_direction(&mut self, dir: Direction) {
        if dir != Direction::None {
            self.next_dir = dir;
        }
    }

    pub fn speed(&self) -> f32 {
        let mut speed = self.tuning.speed;
        if self.power_remaining > 0 {
            speed *= self.tuning.power_multiplier;
        }
        if self.eating_remaining > 0 {
            speed *= self.tuning.eating_multiplier;
        }
        speed
    }

    pub fn update(&mut self, grid: &GridMap) {
        if self.next_dir != Direction::None {
            if let Turn::Accepted { dir, position } = motion::try_turn(
                grid,
                self.position,
                self.dir,
                self.next_dir,
                self.tuning.turn_tolerance,
            ) {
                self.dir = dir;
                self.position = position;
                self.next_dir = Direction::None;
            }
        }

        let moved = motion::advance(grid, self.position, self.dir, self.speed());
        if moved.position != self.position {
            self.anim_phase = (self.anim_phase + 1) % ANIM_PHASES;
        }
        self.position = moved.position;

        self.power_remaining = self.power_remaining.saturating_sub(1);
        self.eating_remaining = self.eating_remaining.saturating_sub(1);
    }

    pub fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    pub fn record_collectible(&mut self, big: bool) {
        self.collectibles_eaten += 1;
        if big {
            self.power_remaining = self.tuning.power_ticks;
            self.eating_remaining = self.tuning.eating_ticks;
        }
    }

    pub fn record_ghost_eaten(&mut self) {
        self.ghosts_eaten += 1;
    }

    pub fn lose_life(&mut self) -> u32 {
        self.lives = self.lives.saturating_sub(1);
        self.lives
    }

    pub fn reset_to_spawn(&mut self) {
        self.position = self.spawn;
        self.dir = Direction::None;
        self.next_dir = Direction::None;
        self.power_remaining = 0;
        self.eating_remaining = 0;
    }

    #[cfg(test)]
    pub(crate) fn teleport(&mut self, pos: Position) {
        self.position = pos;
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            x: self.position.x,
            y: self.position.y,
            dir: self.dir,
            next_dir: self.next_dir,
            speed: self.speed(),
            score: self.score,
            lives: self.lives,
            power_ticks: self.power_remaining,
            anim_phase: self.anim_phase,
        }
    }
}
