//! Reentrant read/write lock guarding one consistency domain
//!
//! A thread holding the write lock may take the write or read lock again
//! without blocking. A thread holding only read locks must not ask for the
//! write lock unless it is the sole reader. There is no writer preference:
//! readers enter whenever no other thread holds the write lock, which keeps
//! nested reads on one thread from deadlocking against a queued writer.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct LockState {
    writer: Option<ThreadId>,
    write_depth: usize,
    /// Read hold count per thread
    readers: HashMap<ThreadId, usize>,
}

impl LockState {
    fn other_readers(&self, me: ThreadId) -> bool {
        self.readers.keys().any(|&t| t != me)
    }
}

/// Reentrant read/write lock
#[derive(Debug, Default)]
pub struct DomainLock {
    state: Mutex<LockState>,
    released: Condvar,
}

impl DomainLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until a shared hold is granted
    pub fn read(&self) -> ReadGuard<'_> {
        self.acquire_read();
        ReadGuard { lock: self, _not_send: PhantomData }
    }

    /// Block until an exclusive hold is granted
    pub fn write(&self) -> WriteGuard<'_> {
        self.acquire_write();
        WriteGuard { lock: self, _not_send: PhantomData }
    }

    /// Take the write lock only if it is immediately available
    pub fn try_write(&self) -> Option<WriteGuard<'_>> {
        if self.try_acquire_write() {
            Some(WriteGuard { lock: self, _not_send: PhantomData })
        } else {
            None
        }
    }

    /// Whether the calling thread currently holds the write lock
    pub fn is_held_by_current_thread(&self) -> bool {
        self.state.lock().writer == Some(thread::current().id())
    }

    /// Whether any thread holds the write lock
    pub fn is_write_locked(&self) -> bool {
        self.state.lock().writer.is_some()
    }

    pub(crate) fn acquire_read(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        while state.writer.is_some_and(|w| w != me) {
            self.released.wait(&mut state);
        }
        *state.readers.entry(me).or_insert(0) += 1;
    }

    pub(crate) fn release_read(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if let Some(count) = state.readers.get_mut(&me) {
            *count -= 1;
            if *count == 0 {
                state.readers.remove(&me);
            }
        }
        drop(state);
        self.released.notify_all();
    }

    pub(crate) fn acquire_write(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            match state.writer {
                Some(w) if w == me => break,
                None if !state.other_readers(me) => break,
                _ => self.released.wait(&mut state),
            }
        }
        state.writer = Some(me);
        state.write_depth += 1;
    }

    pub(crate) fn try_acquire_write(&self) -> bool {
        let me = thread::current().id();
        let mut state = self.state.lock();
        let free = match state.writer {
            Some(w) => w == me,
            None => !state.other_readers(me),
        };
        if free {
            state.writer = Some(me);
            state.write_depth += 1;
        }
        free
    }

    pub(crate) fn release_write(&self) {
        let mut state = self.state.lock();
        debug_assert_eq!(state.writer, Some(thread::current().id()));
        state.write_depth = state.write_depth.saturating_sub(1);
        if state.write_depth == 0 {
            state.writer = None;
        }
        drop(state);
        self.released.notify_all();
    }
}

/// Shared hold on a [`DomainLock`], released on drop
#[must_use]
pub struct ReadGuard<'a> {
    lock: &'a DomainLock,
    // Holds are tracked per thread, so guards must stay on their thread.
    _not_send: PhantomData<*const ()>,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_read();
    }
}

/// Exclusive hold on a [`DomainLock`], released on drop
#[must_use]
pub struct WriteGuard<'a> {
    lock: &'a DomainLock,
    _not_send: PhantomData<*const ()>,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[test]
    fn test_write_is_reentrant() {
        let lock = DomainLock::new();
        let outer = lock.write();
        let inner = lock.write();
        assert!(lock.is_held_by_current_thread());
        drop(inner);
        assert!(lock.is_held_by_current_thread());
        drop(outer);
        assert!(!lock.is_write_locked());
    }

    #[test]
    fn test_read_inside_write() {
        let lock = DomainLock::new();
        let _w = lock.write();
        let _r = lock.read();
        assert!(lock.is_held_by_current_thread());
    }

    #[test]
    fn test_sole_reader_may_upgrade() {
        let lock = DomainLock::new();
        let _r = lock.read();
        assert!(lock.try_write().is_some());
    }

    #[test]
    fn test_writer_excludes_other_threads() {
        let lock = Arc::new(DomainLock::new());
        let entered = Arc::new(AtomicBool::new(false));
        let guard = lock.write();

        let handle = {
            let lock = Arc::clone(&lock);
            let entered = Arc::clone(&entered);
            thread::spawn(move || {
                let _r = lock.read();
                entered.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!entered.load(Ordering::SeqCst));
        drop(guard);
        handle.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
    }

    #[test]
    fn test_try_write_fails_while_other_thread_reads() {
        let lock = Arc::new(DomainLock::new());
        let (tx, rx) = std::sync::mpsc::channel();
        let (done_tx, done_rx) = std::sync::mpsc::channel::<()>();

        let handle = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                let _r = lock.read();
                tx.send(()).unwrap();
                done_rx.recv().unwrap();
            })
        };

        rx.recv().unwrap();
        assert!(lock.try_write().is_none());
        done_tx.send(()).unwrap();
        handle.join().unwrap();
        assert!(lock.try_write().is_some());
    }
}
