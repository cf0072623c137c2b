//! Fixed-size sample history with a running sum.
//!
//! The sum deliberately covers `N - 1` samples, not `N`: every push adds the
//! new sample and subtracts the slot that the *next* push will overwrite.
//! Barometer altitude output depends on this exact window, so it is kept as
//! is and divided by `N - 1` by the consumers.
//!
//! ```text
//! N = 4, after pushing a, b, c, d:
//!
//!   slots  [a][b][c][d]     cursor -> slot 0 (holds a)
//!   sum     b + c + d       (a is the next slot to be overwritten)
//! ```

/// Ring buffer of `N` samples with a cursor and an `N - 1` sample sum.
#[derive(Debug, Clone)]
pub struct SlidingWindow<const N: usize> {
    slots: [i32; N],
    cursor: usize,
    sum: i32,
}

impl<const N: usize> SlidingWindow<N> {
    /// Number of samples covered by [`sum`](Self::sum).
    pub const WINDOW: usize = {
        assert!(N >= 2, "SlidingWindow needs at least two slots");
        N - 1
    };

    /// Create a zero-filled window.
    pub const fn new() -> Self {
        Self {
            slots: [0; N],
            cursor: 0,
            sum: 0,
        }
    }

    /// Insert `sample` at the cursor and advance it.
    pub fn push(&mut self, sample: i32) {
        let next = (self.cursor + 1) % N;
        self.slots[self.cursor] = sample;
        self.sum = self.sum.wrapping_add(sample);
        self.sum = self.sum.wrapping_sub(self.slots[next]);
        self.cursor = next;
    }

    /// Running sum over the `N - 1` most recent samples.
    pub fn sum(&self) -> i32 {
        self.sum
    }

    /// Integer mean of the `N - 1` most recent samples.
    pub fn mean(&self) -> i32 {
        self.sum / Self::WINDOW as i32
    }

    /// Most recently pushed sample (zero before the first push).
    pub fn latest(&self) -> i32 {
        self.slots[(self.cursor + N - 1) % N]
    }

    /// Index of the slot the next push will write, always in `[0, N)`.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Raw slot contents in storage order.
    pub fn slots(&self) -> &[i32; N] {
        &self.slots
    }

    /// Zero every slot, the sum and the cursor.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl<const N: usize> Default for SlidingWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}
