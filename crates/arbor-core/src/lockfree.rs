//! Lock-free scalars shared between the control thread and the audio thread.
//!
//! Writes are benign races: the audio thread may observe a new value one
//! block late, never a torn one.

use atomic_float::AtomicF32;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Cache-line aligned atomic f32.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFloat {
    value: AtomicF32,
}

impl AtomicFloat {
    pub fn new(value: f32) -> Self {
        Self {
            value: AtomicF32::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, value: f32) -> f32 {
        self.value.swap(value, Ordering::AcqRel)
    }
}

impl Default for AtomicFloat {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Cache-line aligned atomic bool.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFlag {
    value: AtomicBool,
}

impl AtomicFlag {
    pub fn new(value: bool) -> Self {
        Self {
            value: AtomicBool::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, value: bool) -> bool {
        self.value.swap(value, Ordering::AcqRel)
    }
}

impl Default for AtomicFlag {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Fixed-capacity list of channel indices, readable from the audio thread
/// without locking. Entries beyond `len` are ignored.
#[derive(Debug)]
pub struct AtomicChannelMap {
    slots: Box<[AtomicUsize]>,
    len: AtomicUsize,
}

impl AtomicChannelMap {
    pub fn identity(len: usize, capacity: usize) -> Self {
        let slots: Box<[AtomicUsize]> = (0..capacity).map(AtomicUsize::new).collect();
        Self {
            slots,
            len: AtomicUsize::new(len.min(capacity)),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    #[inline]
    pub fn get(&self, index: usize) -> usize {
        self.slots[index].load(Ordering::Relaxed)
    }

    /// Caller guarantees `map.len() <= capacity`.
    pub fn store(&self, map: &[usize]) {
        for (slot, &channel) in self.slots.iter().zip(map) {
            slot.store(channel, Ordering::Relaxed);
        }
        self.len.store(map.len(), Ordering::Release);
    }

    pub fn reset_identity(&self, len: usize) {
        for (i, slot) in self.slots.iter().enumerate().take(len) {
            slot.store(i, Ordering::Relaxed);
        }
        self.len.store(len.min(self.slots.len()), Ordering::Release);
    }

    pub fn to_vec(&self) -> Vec<usize> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }
}
