use std::collections::VecDeque;

pub const DEFAULT_WINDOW_CAPACITY: usize = 20;

/// Fixed-capacity FIFO of prices used for moving-average computation.
///
/// Keeps a running sum next to the values so `average()` is O(1). Once the
/// window is full every push evicts the oldest value.
#[derive(Clone, Debug)]
pub struct RollingWindow {
    /// Values in arrival order (front = oldest)
    values: VecDeque<f64>,

    /// Sum of `values`, maintained on push/evict
    sum: f64,

    /// Maximum number of values held
    capacity: usize,
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

impl RollingWindow {
    /// Create an empty window. A zero capacity is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            sum: 0.0,
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        while self.values.len() > self.capacity {
            if let Some(evicted) = self.values.pop_front() {
                self.sum -= evicted;
            }
        }

        // full window: mean is taken over a fresh sum of exactly these values
        if self.values.len() == self.capacity {
            self.sum = self.values.iter().sum();
        }
    }

    /// Arithmetic mean of the current contents, 0.0 when empty.
    pub fn average(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.sum / self.values.len() as f64
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    /// Values oldest first.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }
}
