pub const STACK_SIZE: usize = 16;

/// Fixed-depth stack of subroutine return addresses.
///
/// The top slot is never used: a push is refused once SP reaches
/// `STACK_SIZE - 1`, so at most 15 calls can be nested.
pub struct CallStack {
    slots: [u16; STACK_SIZE],
    sp: u8,
}

/// Returned by `CallStack::push` when the stack is full.
#[derive(Debug, PartialEq, Eq)]
pub struct Full;

impl CallStack {
    pub fn new() -> Self {
        Self {
            slots: [0; STACK_SIZE],
            sp: 0,
        }
    }

    pub fn push(&mut self, addr: u16) -> Result<(), Full> {
        if usize::from(self.sp) == STACK_SIZE - 1 {
            return Err(Full);
        }
        self.slots[usize::from(self.sp)] = addr;
        self.sp += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<u16> {
        self.sp = self.sp.checked_sub(1)?;
        Some(self.slots[usize::from(self.sp)])
    }

    /// Stack pointer: the number of return addresses currently held.
    pub fn sp(&self) -> u8 {
        self.sp
    }

    pub fn is_empty(&self) -> bool {
        self.sp == 0
    }

    /// Return addresses, oldest first.
    pub fn frames(&self) -> &[u16] {
        &self.slots[..usize::from(self.sp)]
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_is_lifo() {
        let mut stack = CallStack::new();
        stack.push(0x200).unwrap();
        stack.push(0x300).unwrap();
        assert_eq!(stack.frames(), &[0x200, 0x300]);
        assert_eq!(stack.pop(), Some(0x300));
        assert_eq!(stack.pop(), Some(0x200));
        assert!(stack.is_empty());
    }

    #[test]
    fn pop_on_empty_stack_fails() {
        let mut stack = CallStack::new();
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.sp(), 0);
    }

    #[test]
    fn fifteen_pushes_fit() {
        let mut stack = CallStack::new();
        for n in 0..(STACK_SIZE - 1) as u16 {
            stack.push(0x200 + n * 2).unwrap();
        }
        assert_eq!(stack.sp(), 15);
        assert_eq!(stack.push(0x400), Err(Full));
        assert_eq!(stack.sp(), 15);
    }
}
