use crate::config::{GhostConfig, LevelConfig};
use crate::engine::motion::{self, Turn};
use crate::engine::targeting::{TargetContext, TargetingStrategy};
use crate::grid::GridMap;
use crate::rng::Rng;
use crate::types::{
    BehaviorMode, Direction, GhostHouseState, GhostView, GlobalMode, GridPos, Position,
};

#[derive(Clone, Debug, PartialEq)]
pub struct GhostTuning {
    pub speed: f32,
    pub frightened_speed: f32,
    pub eaten_speed: f32,
    pub tunnel_multiplier: f32,
    pub frightened_ticks: u32,
    pub turn_tolerance: f32,
    pub exit_tolerance: f32,
}

impl GhostTuning {
    pub fn from_config(config: &LevelConfig) -> Self {
        Self {
            speed: config.speeds.ghost,
            frightened_speed: config.speeds.ghost_frightened,
            eaten_speed: config.speeds.ghost_eaten,
            tunnel_multiplier: config.speeds.tunnel_multiplier,
            frightened_ticks: config.timers.frightened_ticks,
            turn_tolerance: config.tolerances.ghost_turn,
            exit_tolerance: config.tolerances.house_exit,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GhostTickContext<'a> {
    pub grid: &'a GridMap,
    pub player_pos: Position,
    pub player_dir: Direction,
    pub house_exit: Position,
    // Ghost positions as of the start of the tick, indexed by ghost id.
    pub registry: &'a [Position],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GhostTransition {
    LeftHouse,
    Respawned,
}

#[derive(Clone, Debug)]
pub struct Ghost {
    id: usize,
    name: String,
    position: Position,
    spawn: Position,
    scatter_target: Position,
    starts_in_house: bool,
    dir: Direction,
    speed: f32,
    mode: BehaviorMode,
    broadcast_mode: GlobalMode,
    house_state: GhostHouseState,
    frightened_remaining: u32,
    strategy: TargetingStrategy,
    target: Option<Position>,
    decided_at: Option<GridPos>,
    tuning: GhostTuning,
}

impl Ghost {
    pub fn new(id: usize, config: &GhostConfig, grid: &GridMap, tuning: GhostTuning) -> Self {
        let spawn = config.spawn.to_pixels(grid.tile_size());
        let scatter_target = grid.to_pixel_center(config.scatter_corner);
        Self {
            id,
            name: config.name.clone(),
            position: spawn,
            spawn,
            scatter_target,
            starts_in_house: config.starts_in_house,
            dir: Direction::Right,
            speed: tuning.speed,
            mode: BehaviorMode::Scatter,
            broadcast_mode: GlobalMode::Scatter,
            house_state: if config.starts_in_house {
                GhostHouseState::InHouse
            } else {
                GhostHouseState::Active
            },
            frightened_remaining: 0,
            strategy: TargetingStrategy::from_config(&config.strategy, scatter_target),
            target: None,
            decided_at: None,
            tuning,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn direction(&self) -> Direction {
        self.dir
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn mode(&self) -> BehaviorMode {
        self.mode
    }

    pub fn house_state(&self) -> GhostHouseState {
        self.house_state
    }

    pub fn frightened_remaining(&self) -> u32 {
        self.frightened_remaining
    }

    pub fn target(&self) -> Option<Position> {
        self.target
    }

    pub fn is_frightened(&self) -> bool {
        self.mode == BehaviorMode::Frightened
    }

    pub fn is_eaten(&self) -> bool {
        self.mode == BehaviorMode::Eaten
    }

    pub fn in_house(&self) -> bool {
        self.house_state == GhostHouseState::InHouse
    }

    pub fn release(&mut self) -> bool {
        if self.house_state != GhostHouseState::InHouse {
            return false;
        }
        self.house_state = GhostHouseState::Exiting;
        true
    }

    pub fn start_frightened(&mut self) {
        if self.mode == BehaviorMode::Eaten {
            return;
        }
        self.mode = BehaviorMode::Frightened;
        self.frightened_remaining = self.tuning.frightened_ticks;
        self.speed = self.tuning.frightened_speed;
        self.reverse();
    }

    pub fn get_eaten(&mut self) {
        self.mode = BehaviorMode::Eaten;
        self.frightened_remaining = 0;
        self.speed = self.tuning.eaten_speed;
    }

    pub fn apply_global_mode(&mut self, mode: GlobalMode) -> bool {
        self.broadcast_mode = mode;
        let follows_broadcast = matches!(self.mode, BehaviorMode::Scatter | BehaviorMode::Chase);
        if !follows_broadcast || self.house_state != GhostHouseState::Active {
            return false;
        }
        let next = BehaviorMode::from(mode);
        if self.mode == next {
            return false;
        }
        self.mode = next;
        self.reverse();
        true
    }

    pub fn return_to_house(&mut self) {
        self.position = self.spawn;
        self.house_state = if self.starts_in_house {
            GhostHouseState::InHouse
        } else {
            GhostHouseState::Active
        };
        self.dir = Direction::Right;
        self.mode = BehaviorMode::Scatter;
        self.broadcast_mode = GlobalMode::Scatter;
        self.speed = self.tuning.speed;
        self.frightened_remaining = 0;
        self.target = None;
        self.decided_at = None;
    }

    pub fn update(&mut self, ctx: &GhostTickContext, rng: &mut Rng) -> Option<GhostTransition> {
        if self.mode == BehaviorMode::Frightened {
            self.frightened_remaining = self.frightened_remaining.saturating_sub(1);
            if self.frightened_remaining == 0 {
                self.mode = self.broadcast_mode.into();
                self.speed = self.tuning.speed;
            }
        }

        if self.mode == BehaviorMode::Eaten
            && self.position.distance_to(ctx.house_exit) < ctx.grid.tile_size()
        {
            self.respawn();
            return Some(GhostTransition::Respawned);
        }

        match self.house_state {
            GhostHouseState::InHouse => return None,
            GhostHouseState::Exiting => return self.exit_house(ctx.house_exit),
            GhostHouseState::Active => {}
        }

        self.target = self.pick_target(ctx);

        let grid = ctx.grid;
        let speed = self.effective_speed(grid);
        let tile = grid.to_grid(self.position);
        let tolerance = self.tuning.turn_tolerance.max(speed / 2.0);
        if self.decided_at != Some(tile) && motion::is_centered(grid, self.position, tolerance) {
            let chosen = self.choose_direction(grid, rng);
            if let Turn::Accepted { dir, position } =
                motion::try_turn(grid, self.position, self.dir, chosen, tolerance)
            {
                self.dir = dir;
                self.position = position;
            }
            self.decided_at = Some(tile);
        }

        let moved = motion::advance(grid, self.position, self.dir, speed);
        self.position = moved.position;
        if moved.blocked {
            self.decided_at = None;
        }
        None
    }

    pub fn view(&self) -> GhostView {
        GhostView {
            id: self.id,
            name: self.name.clone(),
            x: self.position.x,
            y: self.position.y,
            dir: self.dir,
            mode: self.mode,
            house_state: self.house_state,
            strategy: self.strategy.kind(),
            target: self.target,
            frightened_ticks: self.frightened_remaining,
        }
    }

    #[cfg(test)]
    pub(crate) fn teleport(&mut self, pos: Position) {
        self.position = pos;
        self.decided_at = None;
    }

    fn reverse(&mut self) {
        self.dir = self.dir.opposite();
    }

    fn respawn(&mut self) {
        self.position = self.spawn;
        self.mode = BehaviorMode::Scatter;
        self.speed = self.tuning.speed;
        self.dir = Direction::Up;
        self.house_state = GhostHouseState::Exiting;
        self.target = None;
        self.decided_at = None;
    }

    // Homes on the exit one axis at a time, horizontal gap first.
    fn exit_house(&mut self, exit: Position) -> Option<GhostTransition> {
        let tolerance = self.tuning.exit_tolerance;
        let dx = exit.x - self.position.x;
        if dx != 0.0 {
            // Inside the tolerance the column is snapped, so the climb stays on it.
            self.position.x += if dx.abs() > tolerance {
                dx.signum() * dx.abs().min(self.speed)
            } else {
                dx
            };
            self.dir = if dx > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            };
            return None;
        }
        let dy = exit.y - self.position.y;
        if dy.abs() > tolerance {
            self.position.y += dy.signum() * dy.abs().min(self.speed);
            self.dir = if dy > 0.0 {
                Direction::Down
            } else {
                Direction::Up
            };
            return None;
        }

        self.position = exit;
        self.house_state = GhostHouseState::Active;
        self.dir = Direction::Left;
        if matches!(self.mode, BehaviorMode::Scatter | BehaviorMode::Chase) {
            self.mode = self.broadcast_mode.into();
        }
        self.decided_at = None;
        Some(GhostTransition::LeftHouse)
    }

    fn pick_target(&self, ctx: &GhostTickContext) -> Option<Position> {
        match self.mode {
            BehaviorMode::Eaten => Some(ctx.house_exit),
            BehaviorMode::Frightened => None,
            BehaviorMode::Scatter => Some(self.scatter_target),
            BehaviorMode::Chase => {
                let peer_pos = self
                    .strategy
                    .peer()
                    .and_then(|peer| ctx.registry.get(peer).copied());
                Some(self.strategy.target(&TargetContext {
                    player_pos: ctx.player_pos,
                    player_dir: ctx.player_dir,
                    ghost_pos: self.position,
                    peer_pos,
                    tile_size: ctx.grid.tile_size(),
                }))
            }
        }
    }

    fn choose_direction(&self, grid: &GridMap, rng: &mut Rng) -> Direction {
        let tile = grid.to_grid(self.position);
        let reverse = self.dir.opposite();
        let options: Vec<Direction> = Direction::CARDINALS
            .into_iter()
            .filter(|dir| *dir != reverse && grid.is_walkable_at(tile.step(*dir)))
            .collect();

        if self.mode == BehaviorMode::Frightened {
            return rng.pick(&options).unwrap_or(self.dir);
        }
        let Some(target) = self.target else {
            return self.dir;
        };

        let mut best = self.dir;
        let mut best_distance = f32::INFINITY;
        for dir in options {
            let distance = grid.to_pixel_center(tile.step(dir)).distance_to(target);
            if distance < best_distance {
                best_distance = distance;
                best = dir;
            }
        }
        best
    }

    fn effective_speed(&self, grid: &GridMap) -> f32 {
        let row = grid.to_grid(self.position).y;
        if grid.is_tunnel_row(row) {
            self.speed * self.tuning.tunnel_multiplier
        } else {
            self.speed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReleaseTrigger, StrategyConfig, TilePoint};

    fn grid(lines: &[&str], tunnel_row: Option<i32>) -> GridMap {
        let rows: Vec<String> = lines.iter().map(|line| line.to_string()).collect();
        GridMap::from_rows(&rows, 10.0, tunnel_row).expect("valid test grid")
    }

    fn tuning() -> GhostTuning {
        GhostTuning {
            speed: 2.0,
            frightened_speed: 1.0,
            eaten_speed: 4.0,
            tunnel_multiplier: 0.4,
            frightened_ticks: 600,
            turn_tolerance: 2.0,
            exit_tolerance: 2.0,
        }
    }

    fn ghost_at(grid: &GridMap, x: f32, y: f32, in_house: bool) -> Ghost {
        let config = GhostConfig {
            name: "test".to_string(),
            strategy: StrategyConfig::DirectChaser,
            spawn: TilePoint::new(x / grid.tile_size(), y / grid.tile_size()),
            scatter_corner: GridPos::new(0, 0),
            starts_in_house: in_house,
            release: ReleaseTrigger::Ticks(0),
        };
        Ghost::new(0, &config, grid, tuning())
    }

    fn ctx<'a>(grid: &'a GridMap, player: Position, exit: Position) -> GhostTickContext<'a> {
        GhostTickContext {
            grid,
            player_pos: player,
            player_dir: Direction::None,
            house_exit: exit,
            registry: &[],
        }
    }

    fn cross() -> GridMap {
        grid(&["#####", "## ##", "#   #", "## ##", "#####"], None)
    }

    #[test]
    fn frightened_countdown_reverts_to_broadcast_mode() {
        let grid = cross();
        let mut ghost = ghost_at(&grid, 25.0, 25.0, true);
        ghost.apply_global_mode(GlobalMode::Chase);
        ghost.dir = Direction::Left;

        ghost.start_frightened();
        assert_eq!(ghost.mode(), BehaviorMode::Frightened);
        assert_eq!(ghost.frightened_remaining(), 600);
        assert_eq!(ghost.speed(), 1.0);
        assert_eq!(ghost.direction(), Direction::Right);
        assert_eq!(ghost.position(), Position::new(25.0, 25.0));

        let mut rng = Rng::new(1);
        let tick = ctx(&grid, Position::new(0.0, 0.0), Position::new(25.0, 25.0));
        for _ in 0..599 {
            ghost.update(&tick, &mut rng);
        }
        assert_eq!(ghost.mode(), BehaviorMode::Frightened);
        assert_eq!(ghost.frightened_remaining(), 1);

        ghost.update(&tick, &mut rng);
        assert_eq!(ghost.mode(), BehaviorMode::Chase);
        assert_eq!(ghost.speed(), 2.0);
    }

    #[test]
    fn eaten_ghost_ignores_fright() {
        let grid = cross();
        let mut ghost = ghost_at(&grid, 25.0, 25.0, false);
        ghost.get_eaten();
        ghost.start_frightened();
        assert_eq!(ghost.mode(), BehaviorMode::Eaten);
        assert_eq!(ghost.speed(), 4.0);
        assert!(!ghost.apply_global_mode(GlobalMode::Chase));
        assert_eq!(ghost.mode(), BehaviorMode::Eaten);
    }

    #[test]
    fn eaten_ghost_respawns_near_exit() {
        let grid = cross();
        let mut ghost = ghost_at(&grid, 25.0, 25.0, false);
        ghost.position = Position::new(25.0, 15.0);
        ghost.get_eaten();

        let mut rng = Rng::new(1);
        let tick = ctx(&grid, Position::new(0.0, 0.0), Position::new(25.0, 20.0));
        assert_eq!(ghost.update(&tick, &mut rng), Some(GhostTransition::Respawned));
        assert_eq!(ghost.position(), Position::new(25.0, 25.0));
        assert_eq!(ghost.mode(), BehaviorMode::Scatter);
        assert_eq!(ghost.speed(), 2.0);
        assert_eq!(ghost.house_state(), GhostHouseState::Exiting);
    }

    #[test]
    fn in_house_ghost_never_moves() {
        let grid = cross();
        let mut ghost = ghost_at(&grid, 25.0, 25.0, true);
        let mut rng = Rng::new(3);
        let tick = ctx(&grid, Position::new(15.0, 25.0), Position::new(25.0, 15.0));
        for _ in 0..50 {
            ghost.update(&tick, &mut rng);
            assert_eq!(ghost.position(), Position::new(25.0, 25.0));
            assert_eq!(ghost.house_state(), GhostHouseState::InHouse);
        }
    }

    #[test]
    fn exiting_closes_horizontal_gap_first() {
        let grid = cross();
        let mut ghost = ghost_at(&grid, 15.0, 25.0, true);
        assert!(ghost.release());
        assert!(!ghost.release());
        let exit = Position::new(25.0, 15.0);
        let tick = ctx(&grid, Position::new(0.0, 0.0), exit);
        let mut rng = Rng::new(1);

        ghost.update(&tick, &mut rng);
        assert_eq!(ghost.position(), Position::new(17.0, 25.0));
        for _ in 0..3 {
            ghost.update(&tick, &mut rng);
        }
        assert_eq!(ghost.position(), Position::new(23.0, 25.0));
        // Within the tolerance the last step lands exactly on the exit column.
        ghost.update(&tick, &mut rng);
        assert_eq!(ghost.position(), Position::new(25.0, 25.0));
        assert_eq!(ghost.direction(), Direction::Right);

        ghost.update(&tick, &mut rng);
        assert_eq!(ghost.position(), Position::new(25.0, 23.0));
        assert_eq!(ghost.direction(), Direction::Up);

        let mut transition = None;
        for _ in 0..10 {
            if let Some(found) = ghost.update(&tick, &mut rng) {
                transition = Some(found);
                break;
            }
            assert_eq!(ghost.position().x, 25.0);
        }
        assert_eq!(transition, Some(GhostTransition::LeftHouse));
        assert_eq!(ghost.house_state(), GhostHouseState::Active);
        assert_eq!(ghost.direction(), Direction::Left);
        assert_eq!(ghost.position(), exit);
    }

    #[test]
    fn equal_distances_resolve_in_fixed_order() {
        let grid = cross();
        for _ in 0..5 {
            let mut ghost = ghost_at(&grid, 25.0, 25.0, false);
            ghost.apply_global_mode(GlobalMode::Chase);
            assert_eq!(ghost.mode(), BehaviorMode::Chase);
            ghost.dir = Direction::Right;

            let mut rng = Rng::new(9);
            // Up and Down neighbors are equally close to the target on the left.
            let tick = ctx(&grid, Position::new(15.0, 25.0), Position::new(0.0, 0.0));
            ghost.update(&tick, &mut rng);
            assert_eq!(ghost.direction(), Direction::Up);
            assert_eq!(ghost.position(), Position::new(25.0, 23.0));
        }
    }

    #[test]
    fn frightened_ghost_wanders_without_reversing() {
        let grid = cross();
        let mut seen = Vec::new();
        for seed in 0..40u32 {
            let mut ghost = ghost_at(&grid, 25.0, 25.0, false);
            ghost.dir = Direction::Left;
            ghost.start_frightened();
            assert_eq!(ghost.direction(), Direction::Right);

            let mut rng = Rng::new(seed);
            let tick = ctx(&grid, Position::new(15.0, 25.0), Position::new(0.0, 0.0));
            ghost.update(&tick, &mut rng);
            assert_ne!(ghost.direction(), Direction::Left);
            assert!(ghost.target().is_none());
            if !seen.contains(&ghost.direction()) {
                seen.push(ghost.direction());
            }
        }
        assert!(seen.len() > 1);
    }

    #[test]
    fn cornered_ghost_waits_at_tile_center() {
        let grid = grid(&["#####", "#   #", "#####"], None);
        let mut ghost = ghost_at(&grid, 35.0, 15.0, false);
        ghost.apply_global_mode(GlobalMode::Chase);
        ghost.dir = Direction::Right;
        let mut rng = Rng::new(5);
        let tick = ctx(&grid, Position::new(200.0, 15.0), Position::new(0.0, 0.0));
        for _ in 0..10 {
            ghost.update(&tick, &mut rng);
            assert_eq!(ghost.position(), Position::new(35.0, 15.0));
            assert_eq!(ghost.direction(), Direction::Right);
        }
    }

    #[test]
    fn tunnel_row_slows_active_ghosts() {
        let grid = grid(&["#######", "       ", "#######"], Some(1));
        let mut ghost = ghost_at(&grid, 35.0, 15.0, false);
        ghost.apply_global_mode(GlobalMode::Chase);
        ghost.dir = Direction::Right;
        ghost.decided_at = Some(GridPos::new(3, 1));
        let mut rng = Rng::new(5);
        let tick = ctx(&grid, Position::new(65.0, 15.0), Position::new(0.0, 0.0));
        ghost.update(&tick, &mut rng);
        assert!((ghost.position().x - 35.8).abs() < 1e-4);
    }

    #[test]
    fn broadcast_reverses_active_ghosts_once() {
        let grid = cross();
        let mut active = ghost_at(&grid, 25.0, 25.0, false);
        active.dir = Direction::Up;
        let in_flight = Position::new(25.0, 21.0);
        active.teleport(in_flight);
        assert!(active.apply_global_mode(GlobalMode::Chase));
        assert_eq!(active.direction(), Direction::Down);
        assert_eq!(active.position(), in_flight);
        assert!(!active.apply_global_mode(GlobalMode::Chase));
        assert_eq!(active.direction(), Direction::Down);

        let mut housed = ghost_at(&grid, 25.0, 25.0, true);
        assert!(!housed.apply_global_mode(GlobalMode::Chase));
        assert_eq!(housed.mode(), BehaviorMode::Scatter);

        let mut scared = ghost_at(&grid, 25.0, 25.0, false);
        scared.teleport(in_flight);
        scared.start_frightened();
        assert_eq!(scared.direction(), Direction::Left);
        assert_eq!(scared.position(), in_flight);
        assert!(!scared.apply_global_mode(GlobalMode::Chase));
        assert_eq!(scared.mode(), BehaviorMode::Frightened);
    }

    #[test]
    fn chase_uses_peer_from_registry() {
        let grid = grid(&["#######", "#     #", "#######"], None);
        let config = GhostConfig {
            name: "flank".to_string(),
            strategy: StrategyConfig::Flanking {
                offset_tiles: 1,
                peer: 1,
            },
            spawn: TilePoint::new(3.5, 1.5),
            scatter_corner: GridPos::new(0, 0),
            starts_in_house: false,
            release: ReleaseTrigger::Ticks(0),
        };
        let mut ghost = Ghost::new(0, &config, &grid, tuning());
        ghost.apply_global_mode(GlobalMode::Chase);
        let registry = [Position::new(35.0, 15.0), Position::new(15.0, 15.0)];
        let tick = GhostTickContext {
            grid: &grid,
            player_pos: Position::new(25.0, 15.0),
            player_dir: Direction::Right,
            house_exit: Position::new(0.0, 0.0),
            registry: &registry,
        };
        let mut rng = Rng::new(1);
        ghost.update(&tick, &mut rng);
        // Pivot (35,15) reflected through peer (15,15).
        assert_eq!(ghost.target(), Some(Position::new(55.0, 15.0)));
    }
}
