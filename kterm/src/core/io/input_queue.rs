// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Lock-free single-producer single-consumer input event ring.
//!
//! The front-end thread calls [`InputQueue::write_event`]; the core thread
//! drains with [`InputQueue::pop_event`] during `update()`. Writes never
//! block: a full ring drops the event and latches an overflow flag the
//! host can observe through the terminal status. The producer side must be
//! serialized by the front-end (one writer at a time).

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::InputEvent;

/// Ring capacity (power of two; one slot is sacrificed to distinguish full
/// from empty).
pub const INPUT_QUEUE_SIZE: usize = 256;

pub struct InputQueue {
    slots: Box<[UnsafeCell<MaybeUninit<InputEvent>>]>,
    /// Next slot the producer writes.
    head: AtomicUsize,
    /// Next slot the consumer reads.
    tail: AtomicUsize,
    overflow: AtomicBool,
}

impl std::fmt::Debug for InputQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputQueue")
            .field("pending", &self.pending())
            .field("overflow", &self.overflow.load(Ordering::Relaxed))
            .finish()
    }
}

// SAFETY: the SPSC discipline is the synchronization story. `head` is only
// advanced by the single producer after the slot is initialized (Release),
// and `tail` only by the single consumer after the slot is taken (Release);
// each side Acquire-loads the other's index before touching a slot, so a
// slot is never accessed concurrently from both threads.
unsafe impl Send for InputQueue {}
unsafe impl Sync for InputQueue {}

impl Default for InputQueue {
    fn default() -> Self { Self::new() }
}

impl InputQueue {
    #[must_use]
    pub fn new() -> Self {
        let slots = (0..INPUT_QUEUE_SIZE)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            overflow: AtomicBool::new(false),
        }
    }

    /// Producer side. Never blocks; returns `false` (and latches the
    /// overflow flag) when the ring is full.
    pub fn write_event(&self, event: InputEvent) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) & (INPUT_QUEUE_SIZE - 1);
        if next == self.tail.load(Ordering::Acquire) {
            self.overflow.store(true, Ordering::Relaxed);
            return false;
        }
        // SAFETY: `head` is owned by this (single) producer and the slot at
        // `head` is outside the consumer's visible range until the Release
        // store below.
        unsafe {
            (*self.slots[head].get()).write(event);
        }
        self.head.store(next, Ordering::Release);
        true
    }

    /// Consumer side; FIFO order.
    pub fn pop_event(&self) -> Option<InputEvent> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: the producer published this slot with the Release store
        // of `head` that the Acquire load above observed; the slot is ours
        // until the Release store of `tail` below.
        let event = unsafe { (*self.slots[tail].get()).assume_init_read() };
        self.tail.store((tail + 1) & (INPUT_QUEUE_SIZE - 1), Ordering::Release);
        Some(event)
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail) & (INPUT_QUEUE_SIZE - 1)
    }

    #[must_use]
    pub fn take_overflow(&self) -> bool { self.overflow.swap(false, Ordering::Relaxed) }

    pub fn clear(&self) {
        while self.pop_event().is_some() {}
    }
}

impl Drop for InputQueue {
    fn drop(&mut self) {
        self.clear();
    }
}
