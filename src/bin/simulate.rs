use chrono::{SecondsFormat, Utc};
use clap::Parser;
use maze_chase::config::LevelConfig;
use maze_chase::engine::ghost::Ghost;
use maze_chase::engine::GameEngine;
use maze_chase::error::ConfigError;
use maze_chase::grid::GridMap;
use maze_chase::log::{emit_log, LogLevel};
use maze_chase::types::{
    BehaviorMode, Direction, GameOverReason, GhostHouseState, GridPos, Position, RuntimeEvent,
    Snapshot,
};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};

const DEFAULT_TICK_LIMIT: u64 = 60 * 60 * 5;
const QUICK_CHECK_TICKS: u64 = 60 * 60;
const DANGER_RADIUS_TILES: i32 = 2;
const HUNT_DEPTH_TILES: usize = 6;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    single: bool,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    ticks: Option<u64>,
    #[arg(long)]
    level: Option<PathBuf>,
    #[arg(long)]
    session_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    seed: u32,
    #[serde(rename = "tickLimit")]
    tick_limit: u64,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    reason: Option<GameOverReason>,
    ticks: u64,
    score: u32,
    lives: u32,
    #[serde(rename = "collectiblesEaten")]
    collectibles_eaten: u32,
    #[serde(rename = "remainingCollectibles")]
    remaining_collectibles: usize,
    #[serde(rename = "ghostsEaten")]
    ghosts_eaten: u32,
    deaths: u32,
    releases: u32,
    #[serde(rename = "modeChanges")]
    mode_changes: u32,
    respawns: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug)]
struct ScenarioRunResult {
    result: ScenarioResultLine,
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "sessionId")]
    session_id: String,
    #[serde(rename = "startedAt")]
    started_at: String,
    #[serde(rename = "finishedAt")]
    finished_at: String,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageTicks")]
    average_ticks: u64,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Debug, Default)]
struct AnomalyLog {
    messages: Vec<String>,
    records: Vec<AnomalyRecord>,
    seen: HashSet<String>,
}

impl AnomalyLog {
    fn push(&mut self, tick: u64, message: String) {
        self.records.push(AnomalyRecord {
            tick,
            message: message.clone(),
        });
        if self.seen.insert(message.clone()) {
            self.messages.push(message);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let started_at = now_iso();
    let scenarios = resolve_scenarios(&cli);
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let session_id = cli
        .session_id
        .clone()
        .unwrap_or_else(|| default_session_id(seed_hint, Utc::now().timestamp_millis()));

    let level = match load_level(cli.level.as_deref()) {
        Ok(level) => level,
        Err(error) => {
            emit_log(
                LogLevel::Error,
                "level_load_failed",
                &session_id,
                None,
                None,
                json!({
                    "path": cli.level.as_ref().map(|path| path.to_string_lossy().to_string()),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
    };

    let mut has_anomaly = false;
    let mut results = Vec::new();
    let mut reason_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_ticks = 0u64;
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            LogLevel::Info,
            "scenario_started",
            &session_id,
            Some(scenario.seed),
            None,
            json!({ "scenario": scenario.name, "tickLimit": scenario.tick_limit }),
        );
        let run = match run_scenario(&scenario, &level) {
            Ok(run) => run,
            Err(error) => {
                emit_log(
                    LogLevel::Error,
                    "engine_init_failed",
                    &session_id,
                    Some(scenario.seed),
                    None,
                    json!({ "scenario": scenario.name, "error": error.to_string() }),
                );
                std::process::exit(2);
            }
        };

        for anomaly in &run.anomaly_records {
            emit_log(
                LogLevel::Warn,
                "anomaly_detected",
                &session_id,
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({ "scenario": scenario.name, "message": anomaly.message }),
            );
        }

        has_anomaly |= !run.result.anomalies.is_empty();
        total_anomalies += run.anomaly_records.len();
        total_ticks += run.result.ticks;
        *reason_counts
            .entry(reason_key(run.result.reason).to_string())
            .or_insert(0) += 1;

        emit_log(
            LogLevel::Info,
            "scenario_finished",
            &session_id,
            Some(scenario.seed),
            Some(run.result.ticks),
            json!({
                "scenario": scenario.name,
                "reason": run.result.reason,
                "score": run.result.score,
                "anomalyCount": run.anomaly_records.len(),
            }),
        );

        match serde_json::to_string(&run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => eprintln!("[simulate] result line dropped: {error}"),
        }
        results.push(run.result);
    }

    let summary = build_run_summary(
        session_id.clone(),
        started_at,
        now_iso(),
        results,
        reason_counts,
        total_anomalies,
        total_ticks,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                LogLevel::Error,
                "summary_write_failed",
                &session_id,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        LogLevel::Info,
        "run_finished",
        &session_id,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageTicks": summary.average_ticks,
            "reasonCounts": summary.reason_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn load_level(path: Option<&Path>) -> Result<LevelConfig, ConfigError> {
    match path {
        Some(path) => LevelConfig::from_json_file(path),
        None => Ok(LevelConfig::default()),
    }
}

fn run_scenario(scenario: &Scenario, level: &LevelConfig) -> Result<ScenarioRunResult, ConfigError> {
    let mut engine = GameEngine::new(level.clone(), scenario.seed)?;
    let frightened_cap = level.timers.frightened_ticks;

    let mut anomalies = AnomalyLog::default();
    let mut deaths = 0;
    let mut releases = 0;
    let mut mode_changes = 0;
    let mut respawns = 0;
    let mut previous = engine.build_snapshot(false);

    while !engine.is_ended() && engine.tick() < scenario.tick_limit {
        let input = autopilot_direction(&engine);
        engine.step(input);
        let snapshot = engine.build_snapshot(true);
        for message in collect_snapshot_anomalies(&previous, &snapshot, engine.grid(), frightened_cap) {
            anomalies.push(snapshot.tick, message);
        }

        for event in &snapshot.events {
            match event {
                RuntimeEvent::PlayerDied { .. } => deaths += 1,
                RuntimeEvent::GhostReleased { .. } => releases += 1,
                RuntimeEvent::ModeChanged { .. } => mode_changes += 1,
                RuntimeEvent::GhostRespawned { .. } => respawns += 1,
                _ => {}
            }
        }
        previous = snapshot;
    }

    let summary = engine.build_summary();
    Ok(ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            reason: summary.reason,
            ticks: summary.ticks,
            score: summary.score,
            lives: summary.lives,
            collectibles_eaten: summary.collectibles_eaten,
            remaining_collectibles: summary.remaining_collectibles,
            ghosts_eaten: summary.ghosts_eaten,
            deaths,
            releases,
            mode_changes,
            respawns,
            anomalies: anomalies.messages,
        },
        anomaly_records: anomalies.records,
    })
}

fn collect_snapshot_anomalies(
    previous: &Snapshot,
    current: &Snapshot,
    grid: &GridMap,
    frightened_cap: u32,
) -> Vec<String> {
    let mut anomalies = Vec::new();
    if current.player.score < previous.player.score {
        anomalies.push(format!(
            "score decreased: {} -> {}",
            previous.player.score, current.player.score
        ));
    }
    if current.player.lives > previous.player.lives {
        anomalies.push(format!(
            "lives increased: {} -> {}",
            previous.player.lives, current.player.lives
        ));
    }
    if current.remaining_collectibles > previous.remaining_collectibles {
        anomalies.push("collectibles reappeared".to_string());
    }

    let width = grid.pixel_width();
    let height = grid.height() as f32 * grid.tile_size();
    let off_maze = |x: f32, y: f32| {
        !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 || x >= width || y >= height
    };
    let on_wall = |x: f32, y: f32| {
        let tile = grid.to_grid(Position::new(x, y));
        !grid.is_walkable_at(tile)
    };

    if off_maze(current.player.x, current.player.y) {
        anomalies.push("player left the maze".to_string());
    } else if on_wall(current.player.x, current.player.y) {
        anomalies.push("player inside a wall".to_string());
    }

    for ghost in &current.ghosts {
        if off_maze(ghost.x, ghost.y) {
            anomalies.push(format!("ghost {} left the maze", ghost.name));
        } else if ghost.house_state == GhostHouseState::Active && on_wall(ghost.x, ghost.y) {
            anomalies.push(format!("ghost {} inside a wall", ghost.name));
        }
        if ghost.frightened_ticks > frightened_cap {
            anomalies.push(format!("ghost {} frightened countdown overflow", ghost.name));
        }
        if ghost.mode != BehaviorMode::Frightened && ghost.frightened_ticks != 0 {
            anomalies.push(format!("ghost {} keeps a stale frightened countdown", ghost.name));
        }

        let Some(before) = previous.ghosts.iter().find(|g| g.id == ghost.id) else {
            anomalies.push(format!("ghost {} disappeared", ghost.name));
            continue;
        };
        let stayed_home = before.house_state == GhostHouseState::InHouse
            && ghost.house_state == GhostHouseState::InHouse;
        if stayed_home && (before.x != ghost.x || before.y != ghost.y) {
            anomalies.push(format!("ghost {} moved inside the house", ghost.name));
        }
    }
    anomalies
}

fn is_dangerous(ghost: &Ghost) -> bool {
    ghost.house_state() != GhostHouseState::InHouse
        && !matches!(ghost.mode(), BehaviorMode::Frightened | BehaviorMode::Eaten)
}

fn autopilot_direction(engine: &GameEngine) -> Option<Direction> {
    let grid = engine.grid();
    let start = grid.to_grid(engine.player().position());
    let danger: Vec<GridPos> = engine
        .ghosts()
        .iter()
        .filter(|ghost| is_dangerous(ghost))
        .map(|ghost| grid.to_grid(ghost.position()))
        .collect();
    let prey: Vec<GridPos> = engine
        .ghosts()
        .iter()
        .filter(|ghost| ghost.is_frightened() && ghost.house_state() == GhostHouseState::Active)
        .map(|ghost| grid.to_grid(ghost.position()))
        .collect();
    let risky = |cell: GridPos| {
        danger
            .iter()
            .any(|ghost| (ghost.x - cell.x).abs() + (ghost.y - cell.y).abs() <= DANGER_RADIUS_TILES)
    };
    let has_collectible = |cell: GridPos| grid.cell_at(cell.x, cell.y).is_collectible();

    if !prey.is_empty() {
        if let Some(dir) = bfs_first_step(
            grid,
            start,
            |cell| prey.contains(&cell),
            Some(HUNT_DEPTH_TILES),
            risky,
        ) {
            return Some(dir);
        }
    }
    if has_collectible(start) {
        return None;
    }
    bfs_first_step(grid, start, has_collectible, None, risky)
        .or_else(|| bfs_first_step(grid, start, has_collectible, None, |_| false))
}

fn bfs_first_step(
    grid: &GridMap,
    start: GridPos,
    is_goal: impl Fn(GridPos) -> bool,
    max_depth: Option<usize>,
    avoid: impl Fn(GridPos) -> bool,
) -> Option<Direction> {
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::new();
    for dir in Direction::CARDINALS {
        let next = wrap_tunnel(grid, start.step(dir));
        if grid.is_walkable_at(next) && !avoid(next) && seen.insert(next) {
            queue.push_back((next, dir, 1usize));
        }
    }

    while let Some((cell, first, depth)) = queue.pop_front() {
        if is_goal(cell) {
            return Some(first);
        }
        if max_depth.is_some_and(|max| depth >= max) {
            continue;
        }
        for dir in Direction::CARDINALS {
            let next = wrap_tunnel(grid, cell.step(dir));
            if grid.is_walkable_at(next) && !avoid(next) && seen.insert(next) {
                queue.push_back((next, first, depth + 1));
            }
        }
    }
    None
}

fn wrap_tunnel(grid: &GridMap, cell: GridPos) -> GridPos {
    if grid.is_tunnel_row(cell.y) {
        GridPos::new(cell.x.rem_euclid(grid.width()), cell.y)
    } else {
        cell
    }
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(
        cli.seed
            .unwrap_or_else(|| Utc::now().timestamp_millis().unsigned_abs()),
    );

    if cli.single || cli.ticks.is_some() {
        return vec![Scenario {
            name: "custom".to_string(),
            seed,
            tick_limit: cli.ticks.unwrap_or(DEFAULT_TICK_LIMIT).max(1),
        }];
    }

    vec![
        Scenario {
            name: "quick-check".to_string(),
            seed,
            tick_limit: QUICK_CHECK_TICKS,
        },
        Scenario {
            name: "full-session".to_string(),
            seed: normalize_seed(seed as u64 + 1),
            tick_limit: DEFAULT_TICK_LIMIT,
        },
    ]
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn default_session_id(seed: u32, timestamp_ms: i64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn reason_key(reason: Option<GameOverReason>) -> &'static str {
    match reason {
        Some(GameOverReason::OutOfLives) => "out_of_lives",
        Some(GameOverReason::LevelCleared) => "level_cleared",
        None => "tick_limit",
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn build_run_summary(
    session_id: String,
    started_at: String,
    finished_at: String,
    scenarios: Vec<ScenarioResultLine>,
    reason_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    total_ticks: u64,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let average_ticks = if scenario_count == 0 {
        0
    } else {
        total_ticks / scenario_count as u64
    };
    RunSummary {
        session_id,
        started_at,
        finished_at,
        scenario_count,
        anomaly_count,
        average_ticks,
        reason_counts,
        scenarios,
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result(reason: Option<GameOverReason>, ticks: u64) -> ScenarioResultLine {
        ScenarioResultLine {
            scenario: "test".to_string(),
            seed: 42,
            reason,
            ticks,
            score: 0,
            lives: 3,
            collectibles_eaten: 0,
            remaining_collectibles: 0,
            ghosts_eaten: 0,
            deaths: 0,
            releases: 0,
            mode_changes: 0,
            respawns: 0,
            anomalies: Vec::new(),
        }
    }

    fn classic_engine(seed: u32) -> GameEngine {
        GameEngine::new(LevelConfig::default(), seed).expect("classic level")
    }

    #[test]
    fn default_session_id_contains_seed_and_timestamp() {
        assert_eq!(default_session_id(42, 123456789), "sim-42-123456789");
    }

    #[test]
    fn build_run_summary_calculates_average_ticks() {
        let summary = build_run_summary(
            "sim-42-1".to_string(),
            "a".to_string(),
            "b".to_string(),
            vec![
                make_result(Some(GameOverReason::OutOfLives), 600),
                make_result(None, 900),
            ],
            BTreeMap::from([
                ("out_of_lives".to_string(), 1usize),
                ("tick_limit".to_string(), 1usize),
            ]),
            0,
            1_500,
        );
        assert_eq!(summary.average_ticks, 750);
        assert_eq!(summary.scenario_count, 2);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let target = std::env::temp_dir()
            .join(format!("maze-chase-missing-{}", Utc::now().timestamp_millis()))
            .join("summary.json");
        let summary = build_run_summary(
            "sim-1-1".to_string(),
            now_iso(),
            now_iso(),
            vec![make_result(None, 60)],
            BTreeMap::new(),
            0,
            60,
        );
        assert!(write_summary(&target, &summary).is_err());
    }

    #[test]
    fn anomaly_log_keeps_records_and_deduplicates_messages() {
        let mut log = AnomalyLog::default();
        log.push(10, "same anomaly".to_string());
        log.push(11, "same anomaly".to_string());
        assert_eq!(log.messages.len(), 1);
        assert_eq!(log.records.len(), 2);
        assert_eq!(log.records[1].tick, 11);
    }

    #[test]
    fn reason_keys_cover_tick_limit() {
        assert_eq!(reason_key(None), "tick_limit");
        assert_eq!(reason_key(Some(GameOverReason::LevelCleared)), "level_cleared");
    }

    #[test]
    fn autopilot_heads_for_adjacent_collectible() {
        let engine = classic_engine(1);
        // Spawn (9,16) is open floor with collectibles on both sides; Up comes
        // first in the search order but (9,15) is a wall, so Left wins.
        assert_eq!(autopilot_direction(&engine), Some(Direction::Left));
    }

    #[test]
    fn tampered_snapshot_is_flagged() {
        let mut engine = classic_engine(2);
        let grid = engine.grid().clone();
        engine.step(None);
        let before = engine.build_snapshot(false);
        let mut after = before.clone();
        after.player.score = before.player.score + 10;
        assert!(collect_snapshot_anomalies(&before, &after, &grid, 600).is_empty());

        let mut shrunk = before.clone();
        shrunk.player.score = 0;
        let mut bumped = after.clone();
        bumped.player.lives += 1;
        assert!(!collect_snapshot_anomalies(&after, &shrunk, &grid, 600).is_empty());
        assert!(!collect_snapshot_anomalies(&after, &bumped, &grid, 600).is_empty());

        let mut moved = before.clone();
        moved.ghosts[2].x += 1.0;
        let messages = collect_snapshot_anomalies(&before, &moved, &grid, 600);
        assert_eq!(messages, vec!["ghost Inky moved inside the house".to_string()]);
    }

    #[test]
    fn short_scenario_runs_clean() {
        let scenario = Scenario {
            name: "unit".to_string(),
            seed: 12345,
            tick_limit: 600,
        };
        let run = run_scenario(&scenario, &LevelConfig::default()).expect("classic level");
        assert!(run.result.anomalies.is_empty(), "{:?}", run.result.anomalies);
        assert!(run.result.ticks <= 600);
        assert!(run.result.collectibles_eaten > 0);
        assert!(run.result.releases >= 2);
    }
}
