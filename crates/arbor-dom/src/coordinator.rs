//! Ordered acquisition of domain locks
//!
//! Any operation touching nodes of more than one domain locks every involved
//! domain in ascending [`DomainId`] order and releases in reverse. Because a
//! node's domain can change while we wait, the participants' domains are
//! re-checked once all locks are held; on a mismatch everything is released
//! and the whole acquisition is retried.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::RwLock;

use crate::domain::{Domain, DomainId};
use crate::node::Node;

/// Lock mode of a traced event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Read,
    Write,
}

/// Observable lock transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockEvent {
    Acquired { domain: DomainId, mode: LockMode },
    Released { domain: DomainId, mode: LockMode },
    /// A participant changed domain while we were acquiring
    Retried { attempt: u32 },
}

/// Hook receiving every lock transition
pub trait LockTracer: Send + Sync {
    fn record(&self, thread: ThreadId, event: LockEvent);
}

static TRACING: AtomicBool = AtomicBool::new(false);
static TRACER: RwLock<Option<Arc<dyn LockTracer>>> = parking_lot::const_rwlock(None);

/// Install or clear the process-wide lock tracer
pub fn set_lock_tracer(tracer: Option<Arc<dyn LockTracer>>) {
    let mut slot = TRACER.write();
    TRACING.store(tracer.is_some(), Ordering::Release);
    *slot = tracer;
}

fn trace(event: LockEvent) {
    tracing::trace!(?event, "lock");
    if !TRACING.load(Ordering::Acquire) {
        return;
    }
    if let Some(tracer) = TRACER.read().as_ref() {
        tracer.record(thread::current().id(), event);
    }
}

/// Set of domain write locks held for one mutation
///
/// Released in reverse acquisition order on drop.
#[must_use]
pub struct LockSet {
    held: Vec<Arc<Domain>>,
    _not_send: PhantomData<*const ()>,
}

impl LockSet {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            held: Vec::with_capacity(capacity),
            _not_send: PhantomData,
        }
    }

    fn push(&mut self, domain: Arc<Domain>) {
        domain.lock().acquire_write();
        trace(LockEvent::Acquired {
            domain: domain.id(),
            mode: LockMode::Write,
        });
        self.held.push(domain);
    }

    /// Lock a freshly created domain and keep it until the set drops
    ///
    /// New domains have the highest id so far, so appending keeps the
    /// ascending order.
    pub(crate) fn adopt(&mut self, domain: Arc<Domain>) {
        self.push(domain);
    }

    pub(crate) fn domains(&self) -> &[Arc<Domain>] {
        &self.held
    }

    /// Ids of the held domains in acquisition order
    pub fn domain_ids(&self) -> Vec<DomainId> {
        self.held.iter().map(|d| d.id()).collect()
    }

    pub fn holds(&self, id: DomainId) -> bool {
        self.held.iter().any(|d| d.id() == id)
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

impl Drop for LockSet {
    fn drop(&mut self) {
        while let Some(domain) = self.held.pop() {
            domain.lock().release_write();
            trace(LockEvent::Released {
                domain: domain.id(),
                mode: LockMode::Write,
            });
        }
    }
}

/// Shared hold on one node's current domain
#[must_use]
pub struct ReadLock {
    domain: Arc<Domain>,
    _not_send: PhantomData<*const ()>,
}

impl ReadLock {
    pub fn domain_id(&self) -> DomainId {
        self.domain.id()
    }
}

impl Drop for ReadLock {
    fn drop(&mut self) {
        self.domain.lock().release_read();
        trace(LockEvent::Released {
            domain: self.domain.id(),
            mode: LockMode::Read,
        });
    }
}

/// Acquires domain locks in a globally consistent order
pub struct LockCoordinator;

impl LockCoordinator {
    /// Write-lock the domains of `primary` and every node in `others`
    ///
    /// Blocks until all locks are held and every participant is still in the
    /// domain that was locked for it.
    pub fn acquire(primary: &Node, others: &[Node]) -> LockSet {
        let mut attempt = 0u32;
        loop {
            let mut snapshot: Vec<(Node, Arc<Domain>)> = Vec::with_capacity(others.len() + 1);
            for node in std::iter::once(primary).chain(others) {
                snapshot.push((node.clone(), node.domain()));
            }

            let mut domains: Vec<Arc<Domain>> = snapshot.iter().map(|(_, d)| Arc::clone(d)).collect();
            domains.sort_by_key(|d| d.id());
            domains.dedup_by_key(|d| d.id());

            let mut locks = LockSet::with_capacity(domains.len());
            for domain in domains {
                locks.push(domain);
            }

            if snapshot.iter().all(|(node, domain)| node.domain_id() == domain.id()) {
                return locks;
            }

            drop(locks);
            attempt += 1;
            trace(LockEvent::Retried { attempt });
            thread::yield_now();
        }
    }

    /// Read-lock the current domain of `node`
    pub fn read(node: &Node) -> ReadLock {
        let mut attempt = 0u32;
        loop {
            let domain = node.domain();
            domain.lock().acquire_read();
            trace(LockEvent::Acquired {
                domain: domain.id(),
                mode: LockMode::Read,
            });
            let lock = ReadLock {
                domain,
                _not_send: PhantomData,
            };
            if node.domain_id() == lock.domain_id() {
                return lock;
            }

            drop(lock);
            attempt += 1;
            trace(LockEvent::Retried { attempt });
            thread::yield_now();
        }
    }
}
