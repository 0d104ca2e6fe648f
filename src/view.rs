//! Renderer-side mapping from simulator state to things a drawing layer can
//! consume. Nothing here feeds back into the simulation except the
//! end-of-frame highlight decay, which is the renderer's half of the
//! `modified` / dirty-flag contract.

use crate::effect::{Effect, EffectKind};
use crate::memory::Cell;
use crate::opcode::Op;
use crate::simulator::Simulator;

/// Columns in the tile sheet: bright positive, bright negative, dim
/// positive, dim negative.
pub const TILE_COLUMNS: usize = 4;

/// Horizontal drift of a falling tile over its whole life, in pixels.
const FALL_DRIFT: f32 = 256.0;
/// Vertical drop of a falling tile over its whole life, in pixels.
const FALL_DROP: f32 = 192.0;
/// Starting magnification of a zoom.
const ZOOM_START: f32 = 1.5;

/// Tile sheet index for a cell.
///
/// COPY, SPAWN and HALT have their own rows; PUSH uses the number row of
/// its literal's magnitude, with negatives in the second column. Cells that
/// are no longer highlighted use the dimmed columns.
pub fn tile_index(op: u8, modified: u8) -> usize {
    let (row, mut column) = match Op::decode(op) {
        Op::Copy => (12, 0),
        Op::Spawn => (14, 0),
        Op::Halt => (15, 0),
        Op::Push(v) if v < 0 => (v.unsigned_abs() as usize, 1),
        Op::Push(v) => (v as usize, 0),
    };
    if modified == 0 {
        column += 2;
    }
    row * TILE_COLUMNS + column
}

/// How to draw one effect this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub tile: usize,
    /// Opacity in `[0, 1]`.
    pub blend: f32,
    pub scale: f32,
    /// Top-left corner in pixels.
    pub x: f32,
    pub y: f32,
}

/// Drawing parameters for `effect`, given the cell it sits on and the grid
/// geometry.
pub fn sprite(effect: &Effect, cell: &Cell, columns: usize, tile_w: f32, tile_h: f32) -> Sprite {
    let col = (effect.ip % columns) as f32;
    let row = (effect.ip / columns) as f32;
    let t = effect.fraction();

    match effect.kind {
        EffectKind::Pulse => Sprite {
            tile: tile_index(cell.op, cell.modified),
            blend: t,
            scale: 1.0,
            x: col * tile_w,
            y: row * tile_h,
        },
        EffectKind::Zoom => {
            let zoom = ZOOM_START * (1.0 - t / 2.0);
            Sprite {
                tile: tile_index(cell.op, 1),
                blend: 1.0 - t,
                scale: zoom,
                x: tile_w * (col + (1.0 - zoom) / 2.0),
                y: tile_h * (row + (1.0 - zoom) / 2.0),
            }
        }
        EffectKind::FallForward | EffectKind::FallReverse => {
            let drift = if effect.kind == EffectKind::FallForward {
                FALL_DRIFT
            } else {
                -FALL_DRIFT
            };
            Sprite {
                tile: tile_index(cell.op, 1),
                blend: 1.0 - t,
                scale: 1.0,
                x: col * tile_w + 0.5 + drift * t,
                y: row * tile_h + 0.5 + FALL_DROP * t * t,
            }
        }
    }
}

/// The renderer's end-of-frame pass: fade every highlight by one step and
/// clear the dirty flag. Returns false, touching nothing, when the
/// simulator had nothing new to draw.
pub fn finish_frame<R>(sim: &mut Simulator<R>) -> bool {
    if !sim.is_dirty() {
        return false;
    }
    for cell in sim.memory_mut().cells_mut() {
        cell.modified = cell.modified.saturating_sub(1);
    }
    sim.clear_dirty();
    true
}

/// Plain-text picture of the grid, one line per row.
pub fn render_text<R>(sim: &Simulator<R>) -> String {
    let columns = sim.columns();
    let mut out = String::with_capacity(sim.len() + sim.rows());
    for (i, cell) in sim.memory().cells().iter().enumerate() {
        out.push(cell.decode().glyph());
        if (i + 1) % columns == 0 {
            out.push('\n');
        }
    }
    out
}
