use crate::error::ConfigError;
use crate::types::{CellKind, GridPos, Position};

#[derive(Clone, Debug)]
pub struct GridMap {
    width: i32,
    height: i32,
    tile_size: f32,
    tunnel_row: Option<i32>,
    cells: Vec<CellKind>,
    collectibles: usize,
}

impl GridMap {
    pub fn from_rows(
        rows: &[String],
        tile_size: f32,
        tunnel_row: Option<i32>,
    ) -> Result<Self, ConfigError> {
        let Some(first) = rows.first() else {
            return Err(ConfigError::EmptyLayout);
        };
        let width = first.chars().count();
        if width == 0 {
            return Err(ConfigError::EmptyLayout);
        }
        if !(tile_size > 0.0) {
            return Err(ConfigError::NonPositive {
                field: "tile_size",
                value: tile_size,
            });
        }

        let mut cells = Vec::with_capacity(width * rows.len());
        for (y, row) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != width {
                return Err(ConfigError::RaggedRow {
                    row: y,
                    expected: width,
                    found,
                });
            }
            for (x, glyph) in row.chars().enumerate() {
                let cell = CellKind::from_glyph(glyph)
                    .ok_or(ConfigError::UnknownGlyph { glyph, x, y })?;
                cells.push(cell);
            }
        }

        let height = rows.len() as i32;
        if let Some(row) = tunnel_row {
            if row < 0 || row >= height {
                return Err(ConfigError::TunnelRowOutOfRange { row, height });
            }
        }

        let collectibles = cells.iter().filter(|cell| cell.is_collectible()).count();
        Ok(Self {
            width: width as i32,
            height,
            tile_size,
            tunnel_row,
            cells,
            collectibles,
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn tunnel_row(&self) -> Option<i32> {
        self.tunnel_row
    }

    pub fn pixel_width(&self) -> f32 {
        self.width as f32 * self.tile_size
    }

    pub fn in_bounds(&self, gx: i32, gy: i32) -> bool {
        gx >= 0 && gy >= 0 && gx < self.width && gy < self.height
    }

    pub fn is_tunnel_row(&self, gy: i32) -> bool {
        self.tunnel_row == Some(gy)
    }

    pub fn cell_at(&self, gx: i32, gy: i32) -> CellKind {
        let gx = if self.is_tunnel_row(gy) {
            gx.rem_euclid(self.width)
        } else {
            gx
        };
        if !self.in_bounds(gx, gy) {
            return CellKind::Wall;
        }
        self.cells[self.index(gx, gy)]
    }

    pub fn is_walkable(&self, gx: i32, gy: i32) -> bool {
        self.cell_at(gx, gy) != CellKind::Wall
    }

    pub fn is_walkable_at(&self, cell: GridPos) -> bool {
        self.is_walkable(cell.x, cell.y)
    }

    pub fn to_grid(&self, pos: Position) -> GridPos {
        GridPos {
            x: (pos.x / self.tile_size).floor() as i32,
            y: (pos.y / self.tile_size).floor() as i32,
        }
    }

    pub fn to_pixel_center(&self, cell: GridPos) -> Position {
        Position {
            x: cell.x as f32 * self.tile_size + self.tile_size / 2.0,
            y: cell.y as f32 * self.tile_size + self.tile_size / 2.0,
        }
    }

    pub fn tile_center_of(&self, pos: Position) -> Position {
        self.to_pixel_center(self.to_grid(pos))
    }

    pub fn consume(&mut self, gx: i32, gy: i32) -> Option<CellKind> {
        if !self.in_bounds(gx, gy) {
            return None;
        }
        let idx = self.index(gx, gy);
        let cell = self.cells[idx];
        if !cell.is_collectible() {
            return None;
        }
        self.cells[idx] = CellKind::Open;
        self.collectibles = self.collectibles.saturating_sub(1);
        Some(cell)
    }

    pub fn remaining_collectibles(&self) -> usize {
        self.collectibles
    }

    pub fn rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.width as usize)
            .map(|row| row.iter().map(|cell| cell.glyph()).collect())
            .collect()
    }

    fn index(&self, gx: i32, gy: i32) -> usize {
        (gy * self.width + gx) as usize
    }
}
