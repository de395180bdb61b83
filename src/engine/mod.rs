use crate::config::LevelConfig;
use crate::error::ConfigError;
use crate::grid::GridMap;
use crate::rng::Rng;
use crate::types::{
    CellKind, Direction, GameOverReason, GameSummary, GlobalMode, Position, RuntimeEvent,
    Snapshot, WorldInit,
};

pub mod collision;
pub mod director;
pub mod ghost;
pub mod motion;
pub mod player;
pub mod targeting;

use self::director::ModeDirector;
use self::ghost::{Ghost, GhostTickContext, GhostTransition, GhostTuning};
use self::player::{Player, PlayerTuning};

#[derive(Clone, Debug)]
pub struct GameEngine {
    pub config: LevelConfig,
    seed: u32,
    grid: GridMap,
    rng: Rng,
    player: Player,
    ghosts: Vec<Ghost>,
    director: ModeDirector,
    house_exit: Position,
    events: Vec<RuntimeEvent>,
    tick_counter: u64,
    ended: bool,
    end_reason: Option<GameOverReason>,
}

impl GameEngine {
    pub fn new(config: LevelConfig, seed: u32) -> Result<Self, ConfigError> {
        let grid = config.build_grid()?;
        let tile_size = grid.tile_size();

        let ghost_tuning = GhostTuning::from_config(&config);
        let ghosts = config
            .ghosts
            .iter()
            .enumerate()
            .map(|(id, ghost)| Ghost::new(id, ghost, &grid, ghost_tuning.clone()))
            .collect();
        let releases = config.ghosts.iter().map(|ghost| ghost.release).collect();
        let director = ModeDirector::new(config.mode_schedule.clone(), releases);
        let player = Player::new(
            config.player_spawn.to_pixels(tile_size),
            config.lives,
            PlayerTuning::from_config(&config),
        );
        let house_exit = config.house_exit.to_pixels(tile_size);

        Ok(Self {
            config,
            seed,
            grid,
            rng: Rng::new(seed),
            player,
            ghosts,
            director,
            house_exit,
            events: Vec::new(),
            tick_counter: 0,
            ended: false,
            end_reason: None,
        })
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    pub fn mode(&self) -> GlobalMode {
        self.director.mode()
    }

    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn ghosts(&self) -> &[Ghost] {
        &self.ghosts
    }

    pub fn house_exit(&self) -> Position {
        self.house_exit
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn end_reason(&self) -> Option<GameOverReason> {
        self.end_reason
    }

    pub fn get_world_init(&self) -> WorldInit {
        WorldInit {
            width: self.grid.width(),
            height: self.grid.height(),
            tile_size: self.grid.tile_size(),
            tunnel_row: self.grid.tunnel_row(),
            tiles: self.grid.rows(),
        }
    }

    pub fn step(&mut self, input: Option<Direction>) {
        if self.ended {
            return;
        }
        self.tick_counter += 1;
        if let Some(dir) = input {
            self.player.queue_direction(dir);
        }

        self.update_director();
        self.update_ghosts();
        self.player.update(&self.grid);
        self.collect_under_player();
        self.resolve_contacts();
        if !self.ended && self.grid.remaining_collectibles() == 0 {
            self.finish(GameOverReason::LevelCleared);
        }
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let events = if include_events {
            std::mem::take(&mut self.events)
        } else {
            Vec::new()
        };
        Snapshot {
            tick: self.tick_counter,
            mode: self.director.mode(),
            remaining_collectibles: self.grid.remaining_collectibles(),
            player: self.player.view(),
            ghosts: self.ghosts.iter().map(Ghost::view).collect(),
            events,
        }
    }

    pub fn build_summary(&self) -> GameSummary {
        GameSummary {
            reason: self.end_reason,
            ticks: self.tick_counter,
            score: self.player.score(),
            lives: self.player.lives(),
            collectibles_eaten: self.player.collectibles_eaten(),
            ghosts_eaten: self.player.ghosts_eaten(),
            remaining_collectibles: self.grid.remaining_collectibles(),
        }
    }

    fn update_director(&mut self) {
        let tick = self
            .director
            .tick(self.player.collectibles_eaten(), &mut self.ghosts);
        if let Some(mode) = tick.mode_changed {
            self.events.push(RuntimeEvent::ModeChanged { mode });
        }
        for ghost_id in tick.released {
            self.events.push(RuntimeEvent::GhostReleased { ghost_id });
        }
    }

    fn update_ghosts(&mut self) {
        // Peers are read from where everyone stood when the tick began.
        let registry: Vec<Position> = self.ghosts.iter().map(Ghost::position).collect();
        let ctx = GhostTickContext {
            grid: &self.grid,
            player_pos: self.player.position(),
            player_dir: self.player.direction(),
            house_exit: self.house_exit,
            registry: &registry,
        };
        for ghost in &mut self.ghosts {
            let ghost_id = ghost.id();
            match ghost.update(&ctx, &mut self.rng) {
                Some(GhostTransition::LeftHouse) => {
                    self.events.push(RuntimeEvent::GhostLeftHouse { ghost_id });
                }
                Some(GhostTransition::Respawned) => {
                    self.events.push(RuntimeEvent::GhostRespawned { ghost_id });
                }
                None => {}
            }
        }
    }

    fn collect_under_player(&mut self) {
        let tile = self.grid.to_grid(self.player.position());
        let Some(kind) = collision::collect(
            &mut self.grid,
            &mut self.player,
            &mut self.ghosts,
            self.config.tolerances.collect,
            &self.config.scoring,
        ) else {
            return;
        };
        let big = kind == CellKind::BigCollectible;
        self.events.push(RuntimeEvent::CollectibleEaten {
            x: tile.x,
            y: tile.y,
            big,
        });
        if big {
            self.events.push(RuntimeEvent::GhostsFrightened);
        }
    }

    fn resolve_contacts(&mut self) {
        let outcome = collision::resolve_contacts(
            &mut self.player,
            &mut self.ghosts,
            self.config.tolerances.hitbox_radius,
            self.config.scoring.ghost_eaten,
        );
        for ghost_id in outcome.eaten {
            self.events.push(RuntimeEvent::GhostEaten { ghost_id });
        }
        if outcome.caught_by.is_none() {
            return;
        }

        let lives_left = self.player.lose_life();
        self.events.push(RuntimeEvent::PlayerDied { lives_left });
        if lives_left == 0 {
            self.finish(GameOverReason::OutOfLives);
            return;
        }
        self.player.reset_to_spawn();
        for ghost in &mut self.ghosts {
            ghost.return_to_house();
        }
        self.director.restart();
    }

    fn finish(&mut self, reason: GameOverReason) {
        self.ended = true;
        self.end_reason = Some(reason);
        self.events.push(RuntimeEvent::GameOver { reason });
    }
}
