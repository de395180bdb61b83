use crate::grid::GridMap;
use crate::types::{Direction, Position};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motion {
    pub position: Position,
    // Set when the move was clamped to the tile center by a wall ahead.
    pub blocked: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Turn {
    Accepted { dir: Direction, position: Position },
    Rejected,
}

pub fn is_centered(grid: &GridMap, pos: Position, tolerance: f32) -> bool {
    let center = grid.tile_center_of(pos);
    (pos.x - center.x).abs() <= tolerance && (pos.y - center.y).abs() <= tolerance
}

pub fn advance(grid: &GridMap, pos: Position, dir: Direction, speed: f32) -> Motion {
    if dir == Direction::None || speed <= 0.0 {
        return Motion {
            position: pos,
            blocked: false,
        };
    }

    let tile = grid.to_grid(pos);
    let center = grid.to_pixel_center(tile);
    let mut candidate = pos.offset(dir, speed);

    if !grid.is_walkable_at(tile.step(dir)) {
        let (dx, dy) = dir.vector();
        let past_center = (candidate.x - center.x) * dx as f32 + (candidate.y - center.y) * dy as f32;
        if past_center >= 0.0 {
            return Motion {
                position: center,
                blocked: true,
            };
        }
    }

    candidate.x = candidate.x.rem_euclid(grid.pixel_width());
    Motion {
        position: candidate,
        blocked: false,
    }
}

pub fn try_turn(
    grid: &GridMap,
    pos: Position,
    current: Direction,
    requested: Direction,
    tolerance: f32,
) -> Turn {
    if requested == Direction::None || requested == current {
        return Turn::Accepted {
            dir: current,
            position: pos,
        };
    }
    if current.is_opposite(requested) {
        return Turn::Accepted {
            dir: requested,
            position: pos,
        };
    }
    if !is_centered(grid, pos, tolerance) {
        return Turn::Rejected;
    }

    let tile = grid.to_grid(pos);
    if !grid.is_walkable_at(tile.step(requested)) {
        return Turn::Rejected;
    }

    let center = grid.to_pixel_center(tile);
    let mut position = pos;
    if current.is_horizontal() || requested.is_vertical() {
        position.x = center.x;
    }
    if current.is_vertical() || requested.is_horizontal() {
        position.y = center.y;
    }
    Turn::Accepted {
        dir: requested,
        position,
    }
}
