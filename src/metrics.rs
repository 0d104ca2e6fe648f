use crate::memory::Cell;
use crate::opcode::Op;
use crate::simulator::Simulator;
use crate::thread::Thread;

/// Compute the high-order entropy (HOE) of a byte slice.
///
/// HOE = compressed_size / raw_size, brotli at quality 2. Near 1.0 for
/// noise, well below 1.0 once copies have filled memory with repeats.
pub fn high_order_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut compressed = Vec::new();
    let params = brotli::enc::BrotliEncoderParams {
        quality: 2,
        ..Default::default()
    };
    brotli::BrotliCompress(&mut &data[..], &mut compressed, &params)
        .expect("brotli compression should not fail on valid input");

    compressed.len() as f64 / data.len() as f64
}

/// How many cells hold each kind of operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpCensus {
    pub copy: usize,
    pub halt: usize,
    pub spawn: usize,
    pub push: usize,
}

impl OpCensus {
    pub fn of(cells: &[Cell]) -> Self {
        let mut census = Self::default();
        for cell in cells {
            match cell.decode() {
                Op::Copy => census.copy += 1,
                Op::Halt => census.halt += 1,
                Op::Spawn => census.spawn += 1,
                Op::Push(_) => census.push += 1,
            }
        }
        census
    }

    pub fn total(&self) -> usize {
        self.copy + self.halt + self.spawn + self.push
    }
}

/// Frequency of every op byte across the grid.
pub fn byte_frequency_histogram(cells: &[Cell]) -> [usize; 256] {
    let mut hist = [0usize; 256];
    for cell in cells {
        hist[cell.op as usize] += 1;
    }
    hist
}

/// Summary of the live thread pool.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThreadCensus {
    pub count: usize,
    pub reversed: usize,
    pub max_age: u32,
    pub mean_age: f64,
    pub mean_depth: f64,
}

impl ThreadCensus {
    pub fn of(threads: &[Thread]) -> Self {
        if threads.is_empty() {
            return Self::default();
        }
        let n = threads.len() as f64;
        Self {
            count: threads.len(),
            reversed: threads.iter().filter(|t| t.is_reversed()).count(),
            max_age: threads.iter().map(|t| t.age).max().unwrap_or(0),
            mean_age: threads.iter().map(|t| t.age as f64).sum::<f64>() / n,
            mean_depth: threads.iter().map(|t| t.stack.len() as f64).sum::<f64>() / n,
        }
    }
}

/// One row of simulator statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub cycles: u64,
    pub ops: OpCensus,
    pub threads: ThreadCensus,
    pub effects: usize,
    pub hoe: f64,
}

impl Snapshot {
    pub const CSV_HEADER: &'static str = "cycles,threads,effects,copy,halt,spawn,push,hoe";

    pub fn capture<R>(sim: &Simulator<R>) -> Self {
        let memory = sim.memory();
        Self {
            cycles: sim.cycles(),
            ops: OpCensus::of(memory.cells()),
            threads: ThreadCensus::of(sim.threads()),
            effects: sim.effect_queue().len(),
            hoe: high_order_entropy(&memory.op_bytes()),
        }
    }

    pub fn csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{:.6}",
            self.cycles,
            self.threads.count,
            self.effects,
            self.ops.copy,
            self.ops.halt,
            self.ops.spawn,
            self.ops.push,
            self.hoe
        )
    }
}
