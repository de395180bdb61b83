use crate::config::ScoreConfig;
use crate::engine::ghost::Ghost;
use crate::engine::motion;
use crate::engine::player::Player;
use crate::grid::GridMap;
use crate::types::CellKind;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactOutcome {
    pub eaten: Vec<usize>,
    // Ghost that caught the player, if any. Later ghosts are not checked.
    pub caught_by: Option<usize>,
}

pub fn collect(
    grid: &mut GridMap,
    player: &mut Player,
    ghosts: &mut [Ghost],
    tolerance: f32,
    scoring: &ScoreConfig,
) -> Option<CellKind> {
    let pos = player.position();
    if !motion::is_centered(grid, pos, tolerance) {
        return None;
    }
    let tile = grid.to_grid(pos);
    let kind = grid.consume(tile.x, tile.y)?;

    let big = kind == CellKind::BigCollectible;
    if big {
        player.add_score(scoring.big_collectible);
        for ghost in ghosts.iter_mut() {
            ghost.start_frightened();
        }
    } else {
        player.add_score(scoring.collectible);
    }
    player.record_collectible(big);
    Some(kind)
}

pub fn resolve_contacts(
    player: &mut Player,
    ghosts: &mut [Ghost],
    hitbox_radius: f32,
    ghost_points: u32,
) -> ContactOutcome {
    let reach = hitbox_radius * 2.0;
    let mut outcome = ContactOutcome::default();
    for ghost in ghosts.iter_mut() {
        if ghost.in_house() || ghost.is_eaten() {
            continue;
        }
        if ghost.position().distance_to(player.position()) >= reach {
            continue;
        }
        if ghost.is_frightened() {
            ghost.get_eaten();
            player.add_score(ghost_points);
            player.record_ghost_eaten();
            outcome.eaten.push(ghost.id());
            continue;
        }
        outcome.caught_by = Some(ghost.id());
        break;
    }
    outcome
}
