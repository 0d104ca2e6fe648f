use crate::config::Config;
use crate::effect::{Effect, EffectKind, EffectQueue};
use crate::memory::{Memory, WRITE_HIGHLIGHT};
use crate::opcode::{HALT, Op};
use crate::thread::{StackError, Thread};

/// What a single dispatch did to the thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The thread survives and keeps its place in the pool.
    Running,
    /// The thread executed HALT.
    Halted,
    /// A stack operation failed; the thread must die.
    Fault(StackError),
}

impl Outcome {
    pub fn is_running(self) -> bool {
        self == Outcome::Running
    }
}

impl From<Result<(), StackError>> for Outcome {
    fn from(result: Result<(), StackError>) -> Self {
        match result {
            Ok(()) => Outcome::Running,
            Err(e) => Outcome::Fault(e),
        }
    }
}

/// Execute one instruction for `thread`.
///
/// The op under the instruction pointer is read first, then the pointer
/// moves one cell in the thread's direction. All operand offsets are taken
/// relative to the moved pointer. The caller removes the thread unless
/// `Outcome::Running` comes back.
pub fn step(
    memory: &mut Memory,
    thread: &mut Thread,
    effects: &mut EffectQueue,
    config: &Config,
) -> Outcome {
    thread.age = thread.age.saturating_add(1);

    let pre_ip = thread.ip;
    let op = memory.cell(pre_ip).decode();
    thread.ip = memory.wrap(pre_ip, thread.direction());

    match op {
        Op::Copy => copy(memory, thread, effects, config).into(),
        Op::Halt => Outcome::Halted,
        Op::Spawn => spawn(memory, thread, pre_ip, effects, config).into(),
        Op::Push(literal) => thread.stack.push(literal).into(),
    }
}

/// COPY: pop source offset, destination offset and length, then copy
/// `length` cells one at a time in the thread's direction.
///
/// Cells are read as the copy proceeds, so overlapping regions see values
/// written earlier in the same copy.
fn copy(
    memory: &mut Memory,
    thread: &mut Thread,
    effects: &mut EffectQueue,
    config: &Config,
) -> Result<(), StackError> {
    let source_offset = thread.stack.pop()?;
    let dest_offset = thread.stack.pop()?;
    let length = thread.stack.pop()?;

    let source = memory.wrap(thread.ip, source_offset as i64);
    let dest = memory.wrap(thread.ip, dest_offset as i64);
    let direction = thread.direction();

    for i in 0..length.max(0) as i64 {
        let from = memory.wrap(source, i * direction);
        let to = memory.wrap(dest, i * direction);
        let op = memory.cell(from).op;

        let changed = memory.copy_op(to, op, config.spawn_life_span);

        if config.use_copy_effect {
            effects.push(Effect::new(EffectKind::Zoom, to));
        }
        if changed {
            memory.cell_mut(to).modified = WRITE_HIGHLIGHT;
            memory.mark_dirty();
        }
    }
    Ok(())
}

/// SPAWN: pop a target offset and count down the lifespan of the SPAWN cell
/// itself (the cell at the pre-advance pointer). An expired cell becomes
/// HALT.
///
/// The offset is consumed but no thread is started here; new threads only
/// come from per-cycle injection.
fn spawn(
    memory: &mut Memory,
    thread: &mut Thread,
    pre_ip: usize,
    effects: &mut EffectQueue,
    config: &Config,
) -> Result<(), StackError> {
    let _target_offset = thread.stack.pop()?;

    let cell = memory.cell_mut(pre_ip);
    if cell.lifespan > 0 {
        cell.lifespan -= 1;
        if cell.lifespan == 0 {
            memory.set_op(pre_ip, HALT, config.spawn_life_span);
            if config.use_spawn_expire_effect {
                effects.push(Effect::new(EffectKind::Zoom, pre_ip));
            }
        }
    }
    Ok(())
}
