//! The evaluation stack and its pool.
//!
//! A stack is 1024 256-bit words (32 KiB), too large to allocate per frame.
//! Frames borrow one from a free-list pool and hand it back on every exit
//! path via the [`PooledStack`] guard.
//!
//! Bounds are deliberately not checked here: the dispatch loop verifies the
//! per-opcode stack requirements before any handler touches the stack.

use std::fmt;
use std::sync::{Arc, Mutex};

use lfvm_common::constants::STACK_LIMIT;
use lfvm_common::U256;

pub struct Stack {
    data: Box<[U256; STACK_LIMIT]>,
    stack_ptr: usize,
}

impl Stack {
    fn new() -> Self {
        Self {
            data: Box::new([U256::zero(); STACK_LIMIT]),
            stack_ptr: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stack_ptr
    }

    pub fn is_empty(&self) -> bool {
        self.stack_ptr == 0
    }

    #[inline]
    pub fn full(&self) -> bool {
        self.stack_ptr >= STACK_LIMIT
    }

    /// Live entries, bottom to top.
    pub fn data(&self) -> &[U256] {
        &self.data[..self.stack_ptr]
    }

    #[inline]
    pub fn push(&mut self, value: U256) {
        debug_assert!(self.stack_ptr < STACK_LIMIT);
        self.data[self.stack_ptr] = value;
        self.stack_ptr += 1;
    }

    /// Bump the stack pointer and hand out the new top slot for in-place
    /// writing, sparing a 32-byte copy on hot paths.
    #[inline]
    pub fn push_empty(&mut self) -> &mut U256 {
        debug_assert!(self.stack_ptr < STACK_LIMIT);
        self.stack_ptr += 1;
        &mut self.data[self.stack_ptr - 1]
    }

    #[inline]
    pub fn pop(&mut self) -> U256 {
        debug_assert!(self.stack_ptr > 0);
        self.stack_ptr -= 1;
        self.data[self.stack_ptr]
    }

    #[inline]
    pub fn peek(&mut self) -> &mut U256 {
        debug_assert!(self.stack_ptr > 0);
        &mut self.data[self.stack_ptr - 1]
    }

    /// The `n`-th entry below the top, zero-indexed: `back(0)` is the top.
    #[inline]
    pub fn back(&mut self, n: usize) -> &mut U256 {
        debug_assert!(self.stack_ptr > n);
        &mut self.data[self.stack_ptr - n - 1]
    }

    /// Swap the top with the `n`-th entry below it.
    #[inline]
    pub fn swap(&mut self, n: usize) {
        let top = self.stack_ptr - 1;
        self.data.swap(top, top - n)
    }

    /// Duplicate the `n`-th entry from the top (1-indexed, as in `DUPn`).
    #[inline]
    pub fn dup(&mut self, n: usize) {
        debug_assert!(self.stack_ptr >= n && !self.full());
        self.data[self.stack_ptr] = self.data[self.stack_ptr - n];
        self.stack_ptr += 1;
    }

    /// Test-only: force the stack pointer, e.g. to probe boundary checks.
    pub fn set_stack_ptr(&mut self, stack_ptr: usize) {
        assert!(stack_ptr <= STACK_LIMIT);
        self.stack_ptr = stack_ptr;
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.stack_ptr).rev() {
            let word = self.data[i].to_big_endian();
            write!(f, "    [{:2}] 0x", self.stack_ptr - i - 1)?;
            for (j, byte) in word.iter().enumerate() {
                write!(f, "{byte:02x}")?;
                if (j + 1) % 8 == 0 {
                    write!(f, " ")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Free-list of reusable stacks. Acquisition and release are safe to use
/// from any number of frames in parallel.
#[derive(Default)]
pub struct StackPool {
    free: Mutex<Vec<Stack>>,
}

impl StackPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(self: &Arc<Self>) -> PooledStack {
        let stack = self
            .lock()
            .pop()
            .unwrap_or_else(Stack::new);
        PooledStack {
            stack: Some(stack),
            pool: Arc::clone(self),
        }
    }

    /// Number of stacks currently parked in the pool.
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Stack>> {
        match self.free.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// A stack on loan from a [`StackPool`]. Returned with `stack_ptr = 0` when
/// dropped, which covers every frame exit path.
pub struct PooledStack {
    stack: Option<Stack>,
    pool: Arc<StackPool>,
}

impl std::ops::Deref for PooledStack {
    type Target = Stack;

    fn deref(&self) -> &Stack {
        self.stack.as_ref().expect("stack present until drop")
    }
}

impl std::ops::DerefMut for PooledStack {
    fn deref_mut(&mut self) -> &mut Stack {
        self.stack.as_mut().expect("stack present until drop")
    }
}

impl Drop for PooledStack {
    fn drop(&mut self) {
        if let Some(mut stack) = self.stack.take() {
            stack.stack_ptr = 0;
            self.pool.lock().push(stack);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_roundtrip() {
        let pool = Arc::new(StackPool::new());
        let mut stack = pool.acquire();
        stack.push(U256::from(1));
        *stack.push_empty() = U256::from(2);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop(), U256::from(2));
        assert_eq!(stack.pop(), U256::from(1));
        assert!(stack.is_empty());
    }

    #[test]
    fn swap_and_dup_follow_evm_indexing() {
        let pool = Arc::new(StackPool::new());
        let mut stack = pool.acquire();
        for i in 1..=4u64 {
            stack.push(U256::from(i));
        }
        stack.swap(3); // SWAP3: top <-> 4th
        assert_eq!(*stack.back(0), U256::from(1));
        assert_eq!(*stack.back(3), U256::from(4));

        stack.dup(2); // DUP2
        assert_eq!(*stack.back(0), U256::from(3));
        assert_eq!(stack.len(), 5);
    }

    #[test]
    fn pool_resets_and_reuses_stacks() {
        let pool = Arc::new(StackPool::new());
        {
            let mut stack = pool.acquire();
            stack.push(U256::from(42));
        }
        assert_eq!(pool.idle(), 1);
        let stack = pool.acquire();
        assert!(stack.is_empty());
        assert_eq!(pool.idle(), 0);
    }
}
