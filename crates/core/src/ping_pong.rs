//! Read/write role tracking for a pair of double-buffered targets.
//!
//! Used independently by the trail compositors (CPU and GPU) for their colour
//! buffer pairs and by the video analyzer for its current/previous frames.
//! Pure index math, no buffer ownership.

/// Which of two buffers is read this tick and which is written.
/// `read_index() + write_index() == 1` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PingPong {
    current: usize,
}

impl PingPong {
    /// Starts with buffer 0 as the read side.
    pub fn new() -> Self {
        Self { current: 0 }
    }

    /// Index of the buffer holding last tick's finished result.
    pub fn read_index(&self) -> usize {
        self.current
    }

    /// Index of the buffer being produced this tick.
    pub fn write_index(&self) -> usize {
        1 - self.current
    }

    /// Flips the roles. Called once at the end of a tick.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    /// Splits a two-element array into `(read, write)` borrows.
    pub fn split<'a, T>(&self, pair: &'a mut [T; 2]) -> (&'a T, &'a mut T) {
        let [a, b] = pair;
        if self.current == 0 {
            (a, b)
        } else {
            (b, a)
        }
    }
}
