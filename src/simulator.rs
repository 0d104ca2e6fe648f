use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::{Config, ConfigError};
use crate::effect::{Effect, EffectKind, EffectQueue};
use crate::executor::{self, Outcome};
use crate::memory::{Cell, Memory, THREAD_HIGHLIGHT};
use crate::opcode::{COPY, HALT, NOISE_LITERAL_RANGE, Op, SPAWN};
use crate::thread::{StackError, Thread};

/// Errors that can occur when constructing a simulator.
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("grid must have at least one row and one column, got {rows}x{columns}")]
    EmptyGrid { rows: usize, columns: usize },
    #[error("grid of {rows}x{columns} cells does not fit in memory")]
    GridTooLarge { rows: usize, columns: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Why a thread left the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    Halted,
    Fault(StackError),
    Trimmed,
}

/// Running totals of thread births and deaths since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub spawned: u64,
    pub halted: u64,
    pub faulted: u64,
    pub trimmed: u64,
}

/// The virtual machine: memory grid, thread pool and effect queue, driven
/// by a fixed-timestep cycle loop.
///
/// Single-threaded. All randomness comes from `rng`, so two simulators built
/// from the same seed and fed the same deltas stay identical.
pub struct Simulator<R = SmallRng> {
    memory: Memory,
    /// Scheduling order. New threads go to the front.
    threads: Vec<Thread>,
    effects: EffectQueue,
    config: Config,
    /// Milliseconds not yet consumed by a cycle.
    progress: u64,
    cycles: u64,
    tally: Tally,
    rng: R,
}

impl Simulator<SmallRng> {
    /// Create a simulator whose randomness is seeded from `seed`.
    pub fn new(
        rows: usize,
        columns: usize,
        config: Config,
        seed: u64,
    ) -> Result<Self, SimulatorError> {
        Self::with_rng(rows, columns, config, SmallRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Simulator<R> {
    /// Create a simulator drawing from the given random source.
    ///
    /// Memory is filled with noise when `RandomizeMemoryOnInitialize` is set,
    /// otherwise with HALT.
    pub fn with_rng(
        rows: usize,
        columns: usize,
        config: Config,
        rng: R,
    ) -> Result<Self, SimulatorError> {
        if rows == 0 || columns == 0 {
            return Err(SimulatorError::EmptyGrid { rows, columns });
        }
        let max_cells = isize::MAX as usize / std::mem::size_of::<Cell>();
        if !rows.checked_mul(columns).is_some_and(|n| n <= max_cells) {
            return Err(SimulatorError::GridTooLarge { rows, columns });
        }
        config.validate()?;

        let mut sim = Self {
            memory: Memory::new(rows, columns),
            threads: Vec::new(),
            effects: EffectQueue::new(),
            config,
            progress: 0,
            cycles: 0,
            tally: Tally::default(),
            rng,
        };

        if sim.config.randomize_memory_on_initialize {
            for index in 0..sim.memory.len() {
                sim.set_random_op(index);
            }
        } else {
            let life = sim.config.spawn_life_span;
            for index in 0..sim.memory.len() {
                sim.memory.set_op(index, HALT, life);
            }
        }
        sim.memory.mark_dirty();

        debug!(
            rows,
            columns,
            randomized = sim.config.randomize_memory_on_initialize,
            "simulator initialized"
        );
        Ok(sim)
    }

    /// Advance wall-clock time by `delta_ms`.
    ///
    /// Runs as many whole cycles as the accumulated time allows (possibly
    /// none), then ages every effect by the raw delta. Returns the number of
    /// cycles run.
    pub fn behave(&mut self, delta_ms: u32) -> u32 {
        self.progress += delta_ms as u64;
        let cycle_ms = self.config.ms_per_cycle as u64;

        let mut ran = 0;
        while self.progress >= cycle_ms {
            self.progress -= cycle_ms;
            self.do_cycle();
            ran += 1;
        }
        if ran > 0 {
            trace!(cycles = ran, threads = self.threads.len(), "drained cycles");
        }

        if !self.effects.is_empty() {
            self.effects.advance(delta_ms);
            self.memory.mark_dirty();
        }
        ran
    }

    /// Run one cycle: noise, thread injection, one dispatch per thread,
    /// population trim, highlight. The order is fixed.
    pub fn do_cycle(&mut self) {
        let len = self.memory.len();

        for _ in 0..self.config.random_noise_per_cycle {
            let index = self.rng.gen_range(0..len);
            self.set_random_op(index);
        }

        for _ in 0..self.config.new_threads_per_cycle {
            let ip = self.rng.gen_range(0..len);
            let reversed = self.config.reverse_enabled && self.rng.r#gen::<bool>();
            self.spawn_thread(ip, reversed);
        }

        // A dead thread is removed in place, so the same position then holds
        // the next thread and must not be skipped.
        let mut index = 0;
        while index < self.threads.len() {
            let outcome = executor::step(
                &mut self.memory,
                &mut self.threads[index],
                &mut self.effects,
                &self.config,
            );
            match outcome {
                Outcome::Running => index += 1,
                Outcome::Halted => {
                    self.kill_thread(index, DeathCause::Halted);
                }
                Outcome::Fault(e) => {
                    self.kill_thread(index, DeathCause::Fault(e));
                }
            }
        }

        let max_threads = self.config.max_thread_count as usize;
        while self.threads.len() > max_threads {
            let victim = if self.config.thread_reduction_enabled {
                self.rng.gen_range(0..self.threads.len())
            } else {
                self.oldest_thread()
            };
            self.kill_thread(victim, DeathCause::Trimmed);
        }

        for thread in &self.threads {
            let cell = self.memory.cell_mut(thread.ip);
            if cell.modified != THREAD_HIGHLIGHT {
                cell.modified = THREAD_HIGHLIGHT;
                self.memory.mark_dirty();
            }
        }

        self.cycles += 1;
    }

    /// Start a thread at `ip` (wrapped onto the grid) at the front of the
    /// scheduling order.
    pub fn spawn_thread(&mut self, ip: usize, reversed: bool) {
        let ip = ip % self.memory.len();
        let thread = Thread::new(ip, reversed, self.config.max_stack_size as usize);
        self.threads.insert(0, thread);
        self.tally.spawned += 1;
    }

    /// Remove the thread at `index`, leaving fall and pulse effects where it
    /// stood when death effects are enabled.
    fn kill_thread(&mut self, index: usize, cause: DeathCause) -> Thread {
        let thread = self.threads.remove(index);

        if self.config.use_thread_death_effect {
            let fall = if thread.is_reversed() {
                EffectKind::FallReverse
            } else {
                EffectKind::FallForward
            };
            self.effects.push(Effect::new(fall, thread.ip));
            self.effects.push(Effect::new(EffectKind::Pulse, thread.ip));
        }

        match cause {
            DeathCause::Halted => self.tally.halted += 1,
            DeathCause::Fault(_) => self.tally.faulted += 1,
            DeathCause::Trimmed => self.tally.trimmed += 1,
        }
        trace!(ip = thread.ip, age = thread.age, ?cause, "thread died");
        thread
    }

    /// Position of the first thread with the greatest age.
    fn oldest_thread(&self) -> usize {
        let max_age = self.threads.iter().map(|t| t.age).max().unwrap_or(0);
        self.threads
            .iter()
            .position(|t| t.age == max_age)
            .unwrap_or(0)
    }

    /// Overwrite a cell with an op drawn by the configured noise weights.
    /// Does nothing when every weight is zero.
    fn set_random_op(&mut self, index: usize) {
        let total = self.config.total_slice();
        if total == 0 {
            return;
        }

        let copy = self.config.copy_slice as u64;
        let halt = copy + self.config.halt_slice as u64;
        let push = halt + self.config.push_slice as u64;

        let slice = self.rng.gen_range(0..total);
        let op = if slice < copy {
            COPY
        } else if slice < halt {
            HALT
        } else if slice < push {
            let literal = self
                .rng
                .gen_range(-NOISE_LITERAL_RANGE..=NOISE_LITERAL_RANGE);
            Op::Push(literal).encode()
        } else {
            SPAWN
        };
        self.memory.set_op(index, op, self.config.spawn_life_span);
    }
}

impl<R> Simulator<R> {
    pub fn rows(&self) -> usize {
        self.memory.rows()
    }

    pub fn columns(&self) -> usize {
        self.memory.columns()
    }

    /// Number of cells (`rows * columns`).
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    pub fn cell(&self, index: usize) -> &Cell {
        self.memory.cell(index)
    }

    /// Replace a cell outright. Marks the simulator dirty.
    pub fn set_cell(&mut self, index: usize, cell: Cell) {
        *self.memory.cell_mut(index) = cell;
        self.memory.mark_dirty();
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Mutable grid access for the renderer's end-of-frame pass.
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    /// Queued effects in drawing order. Restartable: every call starts over.
    pub fn effects(&self) -> impl Iterator<Item = &Effect> {
        self.effects.by_render_order()
    }

    pub fn effect_queue(&self) -> &EffectQueue {
        &self.effects
    }

    pub fn is_dirty(&self) -> bool {
        self.memory.is_dirty()
    }

    pub fn clear_dirty(&mut self) {
        self.memory.clear_dirty();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cycles run since construction.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn population_never_exceeds_cap(
            seed in any::<u64>(),
            cap in 0u32..12,
            spawns in 0u32..20,
            reduction in any::<bool>(),
        ) {
            let config = Config {
                max_thread_count: cap,
                new_threads_per_cycle: spawns,
                thread_reduction_enabled: reduction,
                ..Config::screensaver()
            };
            let mut sim = Simulator::new(6, 6, config, seed).unwrap();
            for _ in 0..20 {
                sim.do_cycle();
                prop_assert!(sim.threads().len() <= cap as usize);
            }
        }

        #[test]
        fn state_stays_in_bounds(seed in any::<u64>(), deltas in prop::collection::vec(0u32..200, 1..40)) {
            let mut sim = Simulator::new(5, 7, Config::screensaver(), seed).unwrap();
            let max_stack = sim.config().max_stack_size as usize;
            for d in deltas {
                sim.behave(d);
                prop_assert_eq!(sim.len(), 35);
                for thread in sim.threads() {
                    prop_assert!(thread.ip < 35);
                    prop_assert!(thread.stack.len() <= max_stack);
                }
                for cell in sim.memory().cells() {
                    prop_assert!(cell.lifespan == 0 || cell.op == SPAWN);
                }
                for effect in sim.effects() {
                    prop_assert!(effect.progress <= effect.life_span());
                    prop_assert!(effect.ip < 35);
                }
            }
        }
    }
}
