//! Pending operation queue
//!
//! A multi-producer FIFO with a single-drainer discipline. Producers push
//! without blocking and then race for the drain gate. Whoever holds the gate
//! drains until the queue is empty; a producer that loses the race hands the
//! drain to a background thread, unless some thread is already waiting for the
//! gate, in which case that waiter picks up the new entry too.

use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::config::Config;

/// Node in the MPSC queue
struct MpscNode<T> {
    value: UnsafeCell<MaybeUninit<T>>,
    next: AtomicPtr<MpscNode<T>>,
}

impl<T> MpscNode<T> {
    fn empty() -> *mut Self {
        Box::into_raw(Box::new(Self {
            value: UnsafeCell::new(MaybeUninit::uninit()),
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }

    fn with_value(value: T) -> *mut Self {
        Box::into_raw(Box::new(Self {
            value: UnsafeCell::new(MaybeUninit::new(value)),
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }
}

/// Multi-producer, single-consumer unbounded queue
///
/// Producers swap themselves in as the new tail and then link the previous
/// tail forward. The head is a stub whose value has already been taken.
struct MpscQueue<T> {
    /// Consumer side, only touched through `pop`
    head: UnsafeCell<*mut MpscNode<T>>,
    /// Producer side
    tail: AtomicPtr<MpscNode<T>>,
}

impl<T> MpscQueue<T> {
    fn new() -> Self {
        let stub = MpscNode::empty();
        Self {
            head: UnsafeCell::new(stub),
            tail: AtomicPtr::new(stub),
        }
    }

    /// Push an item (lock-free for multiple producers)
    fn push(&self, value: T) {
        let node = MpscNode::with_value(value);
        let prev = self.tail.swap(node, Ordering::AcqRel);
        // SAFETY: `prev` stays allocated until the consumer moves past it,
        // which cannot happen before its `next` link is set here.
        unsafe { (*prev).next.store(node, Ordering::Release) };
    }

    /// Pop an item
    ///
    /// Returns `None` when empty, or when the next producer has swapped the
    /// tail but not linked yet; that producer drains after linking.
    ///
    /// # Safety
    ///
    /// At most one thread may pop at a time.
    unsafe fn pop(&self) -> Option<T> {
        unsafe {
            let head = *self.head.get();
            let next = (*head).next.load(Ordering::Acquire);
            if next.is_null() {
                return None;
            }
            let value = (*(*next).value.get()).assume_init_read();
            *self.head.get() = next;
            drop(Box::from_raw(head));
            Some(value)
        }
    }
}

impl<T> Drop for MpscQueue<T> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` rules out concurrent consumers.
        unsafe {
            while self.pop().is_some() {}
            drop(Box::from_raw(*self.head.get()));
        }
    }
}

// SAFETY: values move between threads; the consumer side is serialized by
// the drain gate.
unsafe impl<T: Send> Send for MpscQueue<T> {}
unsafe impl<T: Send> Sync for MpscQueue<T> {}

type Handler<T> = Box<dyn Fn(T) + Send + Sync>;

struct Shared<T> {
    queue: MpscQueue<T>,
    gate: Mutex<()>,
    /// Some thread is waiting for the gate and will drain once it has it
    waiter: AtomicBool,
    submitted: AtomicU64,
    processed: AtomicU64,
    background: bool,
    name: &'static str,
    handler: Handler<T>,
}

impl<T: Send + 'static> Shared<T> {
    /// Run the handler on everything queued
    ///
    /// Holding the gate guard is what makes this the only consumer.
    fn drain(&self, _gate: &MutexGuard<'_, ()>) -> usize {
        let mut drained = 0;
        // SAFETY: the gate is held, so no other thread pops.
        while let Some(item) = unsafe { self.queue.pop() } {
            if panic::catch_unwind(AssertUnwindSafe(|| (self.handler)(item))).is_err() {
                tracing::warn!(queue = self.name, "pending operation panicked");
            }
            self.processed.fetch_add(1, Ordering::AcqRel);
            drained += 1;
        }
        if drained > 0 {
            tracing::trace!(queue = self.name, drained, "queue drained");
        }
        drained
    }

    fn drain_as_waiter(&self) {
        let gate = self.gate.lock();
        self.waiter.store(false, Ordering::SeqCst);
        self.drain(&gate);
    }
}

/// FIFO of pending operations with at most one concurrent drain
pub struct PendingQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for PendingQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> PendingQueue<T> {
    /// Create a queue applying `handler` to every submitted item
    ///
    /// The handler runs with the drain gate held. Without background
    /// draining it must not submit to the same queue.
    pub fn new<F>(name: &'static str, config: &Config, handler: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                queue: MpscQueue::new(),
                gate: Mutex::new(()),
                waiter: AtomicBool::new(false),
                submitted: AtomicU64::new(0),
                processed: AtomicU64::new(0),
                background: config.spawn_background_drain,
                name,
                handler: Box::new(handler),
            }),
        }
    }

    /// Enqueue `item` and make sure somebody drains it
    pub fn submit(&self, item: T) {
        let shared = &self.shared;
        shared.submitted.fetch_add(1, Ordering::AcqRel);
        shared.queue.push(item);

        if let Some(gate) = shared.gate.try_lock() {
            shared.drain(&gate);
            return;
        }
        if shared.waiter.swap(true, Ordering::SeqCst) {
            // The waiter drains this entry once it gets the gate.
            return;
        }
        if shared.background {
            let shared = Arc::clone(shared);
            smol::unblock(move || shared.drain_as_waiter()).detach();
        } else {
            shared.drain_as_waiter();
        }
    }

    /// Block until everything submitted so far has been processed
    pub fn wait_idle(&self) {
        let gate = self.shared.gate.lock();
        self.shared.drain(&gate);
    }

    /// Submitted but not yet processed
    pub fn pending(&self) -> u64 {
        let processed = self.shared.processed.load(Ordering::Acquire);
        self.shared.submitted.load(Ordering::Acquire).saturating_sub(processed)
    }

    pub fn processed(&self) -> u64 {
        self.shared.processed.load(Ordering::Acquire)
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }
}

impl<T> fmt::Debug for PendingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingQueue")
            .field("name", &self.shared.name)
            .field("submitted", &self.shared.submitted.load(Ordering::Relaxed))
            .field("processed", &self.shared.processed.load(Ordering::Relaxed))
            .finish()
    }
}
