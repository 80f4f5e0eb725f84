//! Small utilities to manage bounded sample buffers for charts.

use std::collections::VecDeque;

use crate::types::Sample;

pub fn push_capped<T>(dq: &mut VecDeque<T>, v: T, cap: usize) {
    if cap == 0 {
        return;
    }
    while dq.len() >= cap {
        dq.pop_front();
    }
    dq.push_back(v);
}

/// Fixed-capacity FIFO of samples. A sample whose `(interface, timestamp)`
/// key is already present replaces the existing entry in place
/// (last-write-wins) instead of occupying a second slot.
#[derive(Debug, Clone)]
pub struct SampleRing {
    buf: VecDeque<Sample>,
    cap: usize,
}

impl SampleRing {
    pub fn new(cap: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        // Duplicates cluster at the tail in practice, so scan newest-first.
        if let Some(existing) = self
            .buf
            .iter_mut()
            .rev()
            .find(|s| s.timestamp == sample.timestamp && s.interface == sample.interface)
        {
            *existing = sample;
            return;
        }
        push_capped(&mut self.buf, sample, self.cap);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.buf.iter()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }
}
