use std::cell::Cell;
use std::rc::Rc;

/// Monotonic id source shared between a world and the batches registered on it.
///
/// Cloning yields another handle onto the same counter. Ids start at 1 so that
/// 0 can mean "nothing" in the picking buffer.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    counter: Rc<Cell<u32>>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the counter and return the new id.
    pub fn next_id(&self) -> u32 {
        let next = self.counter.get().wrapping_add(1);
        self.counter.set(next);
        next
    }

    /// Restart numbering from 1.
    pub fn reset(&self) {
        self.counter.set(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one() {
        let ids = IdGenerator::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
    }

    #[test]
    fn clones_share_the_counter() {
        let a = IdGenerator::new();
        let b = a.clone();
        a.next_id();
        assert_eq!(b.next_id(), 2);
        b.reset();
        assert_eq!(a.next_id(), 1);
    }
}
