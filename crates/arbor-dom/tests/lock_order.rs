//! Lock acquisition order, observed through the lock tracer

use std::sync::{Arc, Once};
use std::thread::{self, ThreadId};
use std::time::Duration;

use arbor_dom::{DomainId, LockCoordinator, LockEvent, LockMode, LockTracer, Node, set_lock_tracer};
use parking_lot::Mutex;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<(ThreadId, LockEvent)>>,
}

impl LockTracer for Recorder {
    fn record(&self, thread: ThreadId, event: LockEvent) {
        self.events.lock().push((thread, event));
    }
}

static INSTALL: Once = Once::new();
static RECORDER: Mutex<Option<Arc<Recorder>>> = parking_lot::const_mutex(None);

fn recorder() -> Arc<Recorder> {
    INSTALL.call_once(|| {
        let recorder = Arc::new(Recorder::default());
        *RECORDER.lock() = Some(Arc::clone(&recorder));
        set_lock_tracer(Some(recorder));
    });
    RECORDER.lock().clone().unwrap()
}

/// Write-lock events recorded on this thread while running `f`
fn trace_writes(f: impl FnOnce()) -> Vec<LockEvent> {
    let recorder = recorder();
    let me = thread::current().id();
    recorder.events.lock().retain(|(t, _)| *t != me);
    f();
    recorder
        .events
        .lock()
        .iter()
        .filter(|(t, _)| *t == me)
        .map(|(_, e)| *e)
        .filter(|e| {
            matches!(
                e,
                LockEvent::Acquired { mode: LockMode::Write, .. }
                    | LockEvent::Released { mode: LockMode::Write, .. }
            )
        })
        .collect()
}

fn split(events: &[LockEvent]) -> (Vec<DomainId>, Vec<DomainId>) {
    let mut acquired = Vec::new();
    let mut released = Vec::new();
    for event in events {
        match *event {
            LockEvent::Acquired { domain, .. } => {
                assert!(released.is_empty(), "acquired after a release: {events:?}");
                acquired.push(domain);
            }
            LockEvent::Released { domain, .. } => released.push(domain),
            LockEvent::Retried { .. } => {}
        }
    }
    (acquired, released)
}

#[test]
fn test_multi_domain_append_locks_ascending() {
    let first = Node::text("1");
    let parent = Node::element("div", &[]).unwrap();
    let second = Node::text("2");
    let expected = {
        let mut ids = vec![first.domain_id(), parent.domain_id(), second.domain_id()];
        ids.sort();
        ids
    };

    let events = trace_writes(|| {
        parent.append_children(&[second.clone(), first.clone()]).unwrap();
    });
    let (acquired, released) = split(&events);

    assert_eq!(acquired, expected);
    let mut reversed = acquired.clone();
    reversed.reverse();
    assert_eq!(released, reversed);
}

#[test]
fn test_detach_adopts_new_domain_last() {
    let parent = Node::element("div", &[]).unwrap();
    let child = Node::element("p", &[]).unwrap();
    parent.append_child(&child).unwrap();
    let parent_domain = parent.domain_id();

    let events = trace_writes(|| {
        assert!(child.detach());
    });
    let (acquired, released) = split(&events);

    assert_eq!(acquired, vec![parent_domain, child.domain_id()]);
    assert_eq!(released, vec![child.domain_id(), parent_domain]);
}

#[test]
fn test_single_domain_mutation_holds_one_lock() {
    let parent = Node::element("div", &[]).unwrap();
    let child = Node::text("x");
    parent.append_child(&child).unwrap();

    let events = trace_writes(|| {
        parent.set_attribute("id", "a").unwrap();
        child.set_text("y").unwrap();
    });
    let domain = parent.domain_id();
    assert_eq!(
        events,
        vec![
            LockEvent::Acquired { domain, mode: LockMode::Write },
            LockEvent::Released { domain, mode: LockMode::Write },
            LockEvent::Acquired { domain, mode: LockMode::Write },
            LockEvent::Released { domain, mode: LockMode::Write },
        ]
    );
}

#[test]
fn test_wire_id_allocates_under_write_lock() {
    let node = Node::element("div", &[]).unwrap();
    let domain = node.domain_id();
    let events = trace_writes(|| {
        node.wire_id();
    });
    assert_eq!(
        events,
        vec![
            LockEvent::Acquired { domain, mode: LockMode::Write },
            LockEvent::Released { domain, mode: LockMode::Write },
        ]
    );
}

#[test]
fn test_stale_domain_snapshot_is_retried() {
    let recorder = recorder();
    let parent = Node::element("div", &[]).unwrap();
    let child = Node::element("section", &[]).unwrap();
    let grandchild = Node::text("x");
    parent.append_child(&child).unwrap();

    let held = LockCoordinator::acquire(&parent, &[]);
    let worker = {
        let child = child.clone();
        let grandchild = grandchild.clone();
        thread::spawn(move || {
            child.append_child(&grandchild).unwrap();
            thread::current().id()
        })
    };

    // The worker snapshots the parent's domain for `child` and blocks on it.
    thread::sleep(Duration::from_millis(50));
    assert!(child.detach());
    drop(held);
    let worker_id = worker.join().unwrap();

    let retries = recorder
        .events
        .lock()
        .iter()
        .filter(|(t, e)| *t == worker_id && matches!(e, LockEvent::Retried { .. }))
        .count();
    assert!(retries >= 1, "worker never retried");
    assert_ne!(child.domain_id(), parent.domain_id());
    assert_eq!(grandchild.domain_id(), child.domain_id());
    assert_eq!(grandchild.parent(), Some(child.clone()));
    assert_eq!(parent.child_count(), 0);
}
