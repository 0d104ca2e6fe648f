use thiserror::Error;

/// A stack operation that cannot be carried out. The executor answers both
/// by killing the thread; neither ever leaves the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("pop from an empty stack")]
    Underflow,
    #[error("push onto a full stack of {capacity} values")]
    Overflow { capacity: usize },
}

/// Bounded stack of literals. Capacity comes from `MaxStackSize`; storage
/// grows on demand up to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    data: Vec<i32>,
    capacity: usize,
}

impl Stack {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            capacity,
        }
    }

    #[inline(always)]
    pub fn push(&mut self, val: i32) -> Result<(), StackError> {
        if self.data.len() >= self.capacity {
            return Err(StackError::Overflow {
                capacity: self.capacity,
            });
        }
        self.data.push(val);
        Ok(())
    }

    #[inline(always)]
    pub fn pop(&mut self) -> Result<i32, StackError> {
        self.data.pop().ok_or(StackError::Underflow)
    }

    pub fn top(&self) -> Option<i32> {
        self.data.last().copied()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bottom-to-top view of the stored values.
    pub fn as_slice(&self) -> &[i32] {
        &self.data
    }
}

/// A simulated execution context: an instruction pointer walking the grid
/// in one direction with its own stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    /// Always in `[0, memory length)`.
    pub ip: usize,
    pub stack: Stack,
    /// Number of dispatches received.
    pub age: u32,
    reversed: bool,
}

impl Thread {
    pub fn new(ip: usize, reversed: bool, max_stack_size: usize) -> Self {
        Self {
            ip,
            stack: Stack::new(max_stack_size),
            age: 0,
            reversed,
        }
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// +1 when running forward, -1 when reversed.
    #[inline(always)]
    pub fn direction(&self) -> i64 {
        if self.reversed { -1 } else { 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_empty_underflows() {
        let mut stack = Stack::new(4);
        assert_eq!(stack.pop(), Err(StackError::Underflow));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_push_full_overflows() {
        let mut stack = Stack::new(2);
        stack.push(1).unwrap();
        stack.push(2).unwrap();
        assert!(stack.is_full());
        assert_eq!(stack.push(3), Err(StackError::Overflow { capacity: 2 }));
        assert_eq!(stack.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_zero_capacity_rejects_everything() {
        let mut stack = Stack::new(0);
        assert!(stack.push(0).is_err());
        assert!(stack.pop().is_err());
    }

    #[test]
    fn test_large_capacity_is_not_preallocated() {
        let mut t = Thread::new(0, false, u32::MAX as usize);
        assert_eq!(t.stack.capacity(), u32::MAX as usize);
        t.stack.push(3).unwrap();
        assert_eq!(t.stack.pop(), Ok(3));
    }

    #[test]
    fn test_top() {
        let mut stack = Stack::new(3);
        assert_eq!(stack.top(), None);
        stack.push(-4).unwrap();
        stack.push(9).unwrap();
        assert_eq!(stack.top(), Some(9));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_direction() {
        assert_eq!(Thread::new(0, false, 1).direction(), 1);
        assert_eq!(Thread::new(0, true, 1).direction(), -1);
    }

    #[test]
    fn test_new_thread_is_young_and_empty() {
        let t = Thread::new(7, true, 8);
        assert_eq!(t.ip, 7);
        assert_eq!(t.age, 0);
        assert!(t.is_reversed());
        assert!(t.stack.is_empty());
        assert_eq!(t.stack.capacity(), 8);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn pops_return_pushes_in_lifo_order(values in prop::collection::vec(-127i32..=128, 0..64)) {
            let n = values.len();
            let mut stack = Stack::new(n);
            for &v in &values {
                prop_assert!(stack.push(v).is_ok());
            }
            prop_assert!(stack.push(0).is_err());
            prop_assert_eq!(stack.len(), n);
            for &v in values.iter().rev() {
                prop_assert_eq!(stack.pop(), Ok(v));
            }
            prop_assert_eq!(stack.pop(), Err(StackError::Underflow));
        }
    }
}
