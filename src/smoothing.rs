use std::collections::VecDeque;

/// Sliding mean over the last `capacity` angle estimates, oldest evicted first.
///
/// Right after a reset the window is under-full and averages fewer samples.
pub struct SmoothingBuffer {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SmoothingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, angle: f32) -> f32 {
        self.samples.push_back(angle);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }

        self.mean()
    }

    pub fn mean(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.;
        }
        self.samples.iter().sum::<f32>() / self.samples.len() as f32
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples.iter().copied()
    }
}
