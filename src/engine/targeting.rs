use crate::config::StrategyConfig;
use crate::types::{Direction, Position, StrategyKind};

#[derive(Clone, Debug, PartialEq)]
pub enum TargetingStrategy {
    DirectChaser,
    Ambusher { tiles_ahead: i32 },
    Flanking { offset_tiles: i32, peer: usize },
    Conditional { threshold_tiles: f32, corner: Position },
}

#[derive(Clone, Copy, Debug)]
pub struct TargetContext {
    pub player_pos: Position,
    pub player_dir: Direction,
    pub ghost_pos: Position,
    pub peer_pos: Option<Position>,
    pub tile_size: f32,
}

impl TargetingStrategy {
    pub fn from_config(config: &StrategyConfig, corner: Position) -> Self {
        match *config {
            StrategyConfig::DirectChaser => Self::DirectChaser,
            StrategyConfig::Ambusher { tiles_ahead } => Self::Ambusher { tiles_ahead },
            StrategyConfig::Flanking { offset_tiles, peer } => Self::Flanking { offset_tiles, peer },
            StrategyConfig::Conditional { threshold_tiles } => Self::Conditional {
                threshold_tiles,
                corner,
            },
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::DirectChaser => StrategyKind::DirectChaser,
            Self::Ambusher { .. } => StrategyKind::Ambusher,
            Self::Flanking { .. } => StrategyKind::Flanking,
            Self::Conditional { .. } => StrategyKind::Conditional,
        }
    }

    pub fn peer(&self) -> Option<usize> {
        match self {
            Self::Flanking { peer, .. } => Some(*peer),
            _ => None,
        }
    }

    pub fn target(&self, ctx: &TargetContext) -> Position {
        match *self {
            Self::DirectChaser => ctx.player_pos,
            Self::Ambusher { tiles_ahead } => {
                ahead_of(ctx.player_pos, ctx.player_dir, tiles_ahead, ctx.tile_size)
            }
            Self::Flanking { offset_tiles, .. } => {
                let Some(peer) = ctx.peer_pos else {
                    return ctx.player_pos;
                };
                let pivot = ahead_of(ctx.player_pos, ctx.player_dir, offset_tiles, ctx.tile_size);
                Position::new(
                    peer.x + 2.0 * (pivot.x - peer.x),
                    peer.y + 2.0 * (pivot.y - peer.y),
                )
            }
            Self::Conditional {
                threshold_tiles,
                corner,
            } => {
                if ctx.ghost_pos.distance_to(ctx.player_pos) > threshold_tiles * ctx.tile_size {
                    ctx.player_pos
                } else {
                    corner
                }
            }
        }
    }
}

fn ahead_of(pos: Position, dir: Direction, tiles: i32, tile_size: f32) -> Position {
    pos.offset(dir, tiles as f32 * tile_size)
}
