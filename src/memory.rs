use crate::opcode::{Op, SPAWN};

/// Highlight left on a cell by a write.
pub const WRITE_HIGHLIGHT: u8 = 1;
/// Highlight left on a cell by a live thread sitting on it.
pub const THREAD_HIGHLIGHT: u8 = 2;

/// One addressable memory location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cell {
    /// The operation byte.
    pub op: u8,
    /// Decaying highlight counter. 0 = untouched; the renderer counts it down.
    pub modified: u8,
    /// For SPAWN cells, how many SPAWN executions remain before the cell
    /// reverts to HALT. Zero for every other op.
    pub lifespan: u32,
}

impl Cell {
    #[inline(always)]
    pub fn decode(&self) -> Op {
        Op::decode(self.op)
    }
}

/// Wrap `index + delta` onto a ring of `len` cells.
///
/// Uses the Euclidean remainder so a negative sum never reaches the modulo.
#[inline(always)]
pub fn wrap(index: usize, delta: i64, len: usize) -> usize {
    debug_assert!(len > 0);
    (index as i64 + delta).rem_euclid(len as i64) as usize
}

/// The toroidal memory grid, stored row-major.
///
/// Its length is fixed at construction. The dirty flag lives here because
/// every mutation of a cell passes through this type.
pub struct Memory {
    cells: Vec<Cell>,
    rows: usize,
    columns: usize,
    dirty: bool,
}

impl Memory {
    /// Allocate `rows * columns` zeroed cells. Both dimensions must be
    /// positive and their product must not overflow.
    pub fn new(rows: usize, columns: usize) -> Self {
        debug_assert!(rows > 0 && columns > 0);
        Self {
            cells: vec![Cell::default(); rows * columns],
            rows,
            columns,
            dirty: true,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Mutable access for the renderer. Marks the grid dirty.
    pub fn cells_mut(&mut self) -> &mut [Cell] {
        self.dirty = true;
        &mut self.cells
    }

    /// The operation bytes alone, in grid order.
    pub fn op_bytes(&self) -> Vec<u8> {
        self.cells.iter().map(|c| c.op).collect()
    }

    #[inline(always)]
    pub fn cell(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    #[inline(always)]
    pub fn cell_mut(&mut self, index: usize) -> &mut Cell {
        &mut self.cells[index]
    }

    #[inline(always)]
    pub fn wrap(&self, index: usize, delta: i64) -> usize {
        wrap(index, delta, self.cells.len())
    }

    /// Write an operation byte into a cell.
    ///
    /// Always resets the highlight to `WRITE_HIGHLIGHT`, gives SPAWN cells a
    /// fresh `spawn_life_span` (every other op gets 0) and marks the grid dirty.
    pub fn set_op(&mut self, index: usize, op: u8, spawn_life_span: u32) {
        let cell = &mut self.cells[index];
        cell.op = op;
        cell.modified = WRITE_HIGHLIGHT;
        cell.lifespan = if op == SPAWN { spawn_life_span } else { 0 };
        self.dirty = true;
    }

    /// Write an operation byte on behalf of COPY. Returns whether the op
    /// changed.
    ///
    /// Op and lifespan follow `set_op`, but the highlight and the dirty flag
    /// are left to the caller so that copying a cell onto an identical one
    /// leaves no trace.
    pub fn copy_op(&mut self, index: usize, op: u8, spawn_life_span: u32) -> bool {
        let cell = &mut self.cells[index];
        let changed = cell.op != op;
        cell.op = op;
        cell.lifespan = if op == SPAWN { spawn_life_span } else { 0 };
        changed
    }

    #[inline(always)]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::{COPY, HALT};

    #[test]
    fn test_new_grid_dimensions() {
        let mem = Memory::new(3, 5);
        assert_eq!(mem.len(), 15);
        assert_eq!(mem.rows(), 3);
        assert_eq!(mem.columns(), 5);
        assert!(mem.is_dirty());
    }

    #[test]
    fn test_wrap_forward_past_end() {
        assert_eq!(wrap(3, 1, 4), 0);
    }

    #[test]
    fn test_wrap_backward_past_start() {
        assert_eq!(wrap(0, -1, 4), 3);
    }

    #[test]
    fn test_wrap_large_negative_offset() {
        assert_eq!(wrap(2, -127, 4), 3);
    }

    #[test]
    fn test_set_op_spawn_gets_lifespan() {
        let mut mem = Memory::new(2, 2);
        mem.clear_dirty();
        mem.set_op(1, SPAWN, 9);
        assert_eq!(mem.cell(1).op, SPAWN);
        assert_eq!(mem.cell(1).lifespan, 9);
        assert_eq!(mem.cell(1).modified, WRITE_HIGHLIGHT);
        assert!(mem.is_dirty());
    }

    #[test]
    fn test_set_op_clears_lifespan() {
        let mut mem = Memory::new(2, 2);
        mem.set_op(1, SPAWN, 9);
        mem.set_op(1, COPY, 9);
        assert_eq!(mem.cell(1).lifespan, 0);
        mem.set_op(1, HALT, 9);
        assert_eq!(mem.cell(1).lifespan, 0);
    }

    #[test]
    fn test_copy_op_reports_change() {
        let mut mem = Memory::new(1, 2);
        mem.set_op(0, HALT, 5);
        mem.cell_mut(0).modified = 0;
        mem.clear_dirty();
        assert!(!mem.copy_op(0, HALT, 5));
        assert_eq!(mem.cell(0).modified, 0);
        assert!(!mem.is_dirty());
        assert!(mem.copy_op(0, SPAWN, 5));
        assert_eq!(mem.cell(0).lifespan, 5);
    }

    #[test]
    fn test_cells_mut_marks_dirty() {
        let mut mem = Memory::new(1, 1);
        mem.clear_dirty();
        mem.cells_mut()[0].modified = 0;
        assert!(mem.is_dirty());
    }
}
