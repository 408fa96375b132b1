//! Range subscriptions and write notification.
//!
//! Listeners are stored in a sorted index keyed by the common prefix of
//! their bounds plus their id, so finding the listeners for a written tuple
//! is a handful of narrow range scans instead of a walk over every
//! subscription. Callbacks run outside all locks and are isolated from one
//! another: a panicking listener is logged and the rest still fire.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;
use tupledb_codec::{Tuple, Value};
use tupledb_storage::sorted::{self, SearchResult, TupleKeyed};
use tupledb_storage::{Bounds, WriteOps};
use uuid::Uuid;

/// Callback invoked with the subset of a committed write-set that landed
/// inside the subscribed bounds.
pub type ListenerCallback = Arc<dyn Fn(&WriteOps) + Send + Sync>;

struct Listener {
    id: Uuid,
    bounds: Bounds,
    callback: ListenerCallback,
}

struct IndexEntry {
    /// Common prefix of the listener's bounds, terminated by its id.
    key: Tuple,
    listener: Listener,
}

impl TupleKeyed for IndexEntry {
    fn key(&self) -> &Tuple {
        &self.key
    }
}

/// A pending notification: one callback plus the writes it should see.
pub(crate) struct Emit {
    callback: ListenerCallback,
    writes: WriteOps,
}

/// Sorted index of active listeners.
#[derive(Default)]
pub(crate) struct ReactivityTracker {
    index: Vec<IndexEntry>,
}

impl ReactivityTracker {
    /// Registers a listener over `bounds`; returns its index key.
    pub(crate) fn subscribe(&mut self, bounds: Bounds, callback: ListenerCallback) -> Tuple {
        let id = Uuid::new_v4();
        let mut key = common_prefix(&bounds);
        key.push(Value::String(id.simple().to_string()));
        sorted::upsert(
            &mut self.index,
            IndexEntry {
                key: key.clone(),
                listener: Listener {
                    id,
                    bounds,
                    callback,
                },
            },
        );
        key
    }

    /// Removes the listener stored under `key`, if still present.
    pub(crate) fn unsubscribe(&mut self, key: &Tuple) {
        sorted::remove(&mut self.index, key);
    }

    /// Collects the notifications a write-set will trigger.
    ///
    /// Every tuple the write-set touches is matched against listeners whose
    /// index prefix is a prefix of that tuple, then against their exact
    /// bounds. Each listener receives at most one emit per commit, carrying
    /// only the operations inside its bounds.
    pub(crate) fn compute_emits(&self, writes: &WriteOps) -> Vec<Emit> {
        let mut pending: Vec<(Uuid, Emit)> = Vec::new();

        for pair in &writes.set {
            for listener in self.matching(&pair.key) {
                let emit = entry_for(&mut pending, listener);
                emit.writes.set.push(pair.clone());
            }
        }
        for tuple in &writes.remove {
            for listener in self.matching(tuple) {
                let emit = entry_for(&mut pending, listener);
                emit.writes.remove.push(tuple.clone());
            }
        }

        pending.into_iter().map(|(_, emit)| emit).collect()
    }

    /// Runs a batch of notifications, isolating panics per callback.
    pub(crate) fn fire(emits: Vec<Emit>) {
        for emit in emits {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                (emit.callback)(&emit.writes);
            }));
            if result.is_err() {
                error!("subscription callback panicked; listener skipped for this commit");
            }
        }
    }

    /// Listeners whose bounds contain `tuple`.
    ///
    /// Every ancestor prefix of `tuple` (including the empty one) is probed
    /// in the index; entries at exactly `prefix + [id]` are candidates.
    fn matching<'a>(&'a self, tuple: &Tuple) -> impl Iterator<Item = &'a Listener> {
        let mut found: Vec<&Listener> = Vec::new();
        for prefix_len in 0..=tuple.len() {
            for entry in self.prefix_group(&tuple[..prefix_len]) {
                if entry.key.len() == prefix_len + 1 && entry.listener.bounds.contains(tuple) {
                    found.push(&entry.listener);
                }
            }
        }
        found.into_iter()
    }

    /// Index entries sorted between `prefix + [Min]` and `prefix + [Max]`.
    ///
    /// Both edges are located by binary search against sentinel-padded
    /// keys, so the lookup cannot fail.
    fn prefix_group(&self, prefix: &[Value]) -> &[IndexEntry] {
        let mut lower: Tuple = prefix.to_vec();
        lower.push(Value::Min);
        let mut upper: Tuple = prefix.to_vec();
        upper.push(Value::Max);
        let start = match sorted::search(&self.index, &lower) {
            SearchResult::Found(i) | SearchResult::Closest(i) => i,
        };
        let end = match sorted::search(&self.index, &upper) {
            SearchResult::Found(i) => i + 1,
            SearchResult::Closest(i) => i,
        };
        &self.index[start..end]
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }
}

fn entry_for<'a>(pending: &'a mut Vec<(Uuid, Emit)>, listener: &Listener) -> &'a mut Emit {
    if let Some(at) = pending.iter().position(|(id, _)| *id == listener.id) {
        return &mut pending[at].1;
    }
    pending.push((
        listener.id,
        Emit {
            callback: Arc::clone(&listener.callback),
            writes: WriteOps::default(),
        },
    ));
    let last = pending.len() - 1;
    &mut pending[last].1
}

/// Longest leading run of elements the two edges of `bounds` agree on.
///
/// Listeners over unbounded or divergent ranges index under a short (or
/// empty) prefix and are simply probed more often.
fn common_prefix(bounds: &Bounds) -> Tuple {
    let (Some(lower), Some(upper)) = (bounds.lower(), bounds.upper()) else {
        return Vec::new();
    };
    lower
        .iter()
        .zip(upper.iter())
        .take_while(|(a, b)| a == b && !matches!(a, Value::Min | Value::Max))
        .map(|(a, _)| a.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tupledb_codec::tuple;
    use tupledb_storage::KeyValuePair;

    fn prefix_bounds(prefix: Tuple) -> Bounds {
        let mut lower = prefix.clone();
        lower.push(Value::Min);
        let mut upper = prefix;
        upper.push(Value::Max);
        Bounds {
            gte: Some(lower),
            lte: Some(upper),
            ..Bounds::default()
        }
    }

    fn recording() -> (ListenerCallback, Arc<Mutex<Vec<WriteOps>>>) {
        let seen: Arc<Mutex<Vec<WriteOps>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ListenerCallback = Arc::new(move |writes: &WriteOps| {
            sink.lock().push(writes.clone());
        });
        (callback, seen)
    }

    fn set_op(key: Tuple) -> WriteOps {
        WriteOps {
            set: vec![KeyValuePair::new(key, 1.0)],
            remove: Vec::new(),
        }
    }

    #[test]
    fn listener_inside_bounds_fires() {
        let mut tracker = ReactivityTracker::default();
        let (callback, seen) = recording();
        tracker.subscribe(prefix_bounds(tuple!["users"]), callback);

        let writes = set_op(tuple!["users", "jon"]);
        ReactivityTracker::fire(tracker.compute_emits(&writes));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], writes);
    }

    #[test]
    fn listener_outside_bounds_stays_silent() {
        let mut tracker = ReactivityTracker::default();
        let (callback, seen) = recording();
        tracker.subscribe(prefix_bounds(tuple!["users"]), callback);

        ReactivityTracker::fire(tracker.compute_emits(&set_op(tuple!["posts", "1"])));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn one_emit_per_listener_per_commit() {
        let mut tracker = ReactivityTracker::default();
        let (callback, seen) = recording();
        tracker.subscribe(prefix_bounds(tuple!["users"]), callback);

        let writes = WriteOps {
            set: vec![
                KeyValuePair::new(tuple!["users", "a"], 1.0),
                KeyValuePair::new(tuple!["users", "b"], 2.0),
            ],
            remove: vec![tuple!["users", "c"]],
        };
        ReactivityTracker::fire(tracker.compute_emits(&writes));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].set.len(), 2);
        assert_eq!(seen[0].remove, vec![tuple!["users", "c"]]);
    }

    #[test]
    fn emit_is_filtered_to_the_listener_bounds() {
        let mut tracker = ReactivityTracker::default();
        let (callback, seen) = recording();
        tracker.subscribe(prefix_bounds(tuple!["users"]), callback);

        let writes = WriteOps {
            set: vec![
                KeyValuePair::new(tuple!["users", "a"], 1.0),
                KeyValuePair::new(tuple!["posts", "1"], 2.0),
            ],
            remove: Vec::new(),
        };
        ReactivityTracker::fire(tracker.compute_emits(&writes));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].set.len(), 1);
        assert_eq!(seen[0].set[0].key, tuple!["users", "a"]);
    }

    #[test]
    fn sentinel_padded_gt_lt_bounds_fire_exactly() {
        let mut tracker = ReactivityTracker::default();
        let (callback, seen) = recording();
        // Everything strictly between the ["a","a"] and ["a","c"] groups.
        tracker.subscribe(
            Bounds {
                gt: Some(vec![
                    Value::String("a".into()),
                    Value::String("a".into()),
                    Value::Max,
                ]),
                lt: Some(vec![
                    Value::String("a".into()),
                    Value::String("c".into()),
                    Value::Min,
                ]),
                ..Bounds::default()
            },
            callback,
        );

        let writes = set_op(tuple!["a", "b", 1.0]);
        ReactivityTracker::fire(tracker.compute_emits(&writes));
        assert_eq!(seen.lock().as_slice(), &[writes]);

        ReactivityTracker::fire(tracker.compute_emits(&set_op(tuple!["a", "c", 1.0])));
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn unbounded_listener_sees_everything() {
        let mut tracker = ReactivityTracker::default();
        let (callback, seen) = recording();
        tracker.subscribe(Bounds::default(), callback);

        ReactivityTracker::fire(tracker.compute_emits(&set_op(tuple!["anything", 3.0])));
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let mut tracker = ReactivityTracker::default();
        let (callback, seen) = recording();
        let key = tracker.subscribe(prefix_bounds(tuple!["users"]), callback);
        assert_eq!(tracker.len(), 1);

        tracker.unsubscribe(&key);
        assert_eq!(tracker.len(), 0);

        ReactivityTracker::fire(tracker.compute_emits(&set_op(tuple!["users", "jon"])));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn panicking_listener_does_not_block_others() {
        let mut tracker = ReactivityTracker::default();
        let panicking: ListenerCallback = Arc::new(|_writes: &WriteOps| {
            panic!("listener bug");
        });
        tracker.subscribe(prefix_bounds(tuple!["users"]), panicking);
        let (callback, seen) = recording();
        tracker.subscribe(prefix_bounds(tuple!["users"]), callback);

        ReactivityTracker::fire(tracker.compute_emits(&set_op(tuple!["users", "jon"])));
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn two_listeners_both_fire() {
        let mut tracker = ReactivityTracker::default();
        let (first_cb, first) = recording();
        let (second_cb, second) = recording();
        tracker.subscribe(prefix_bounds(tuple!["users"]), first_cb);
        tracker.subscribe(Bounds::default(), second_cb);

        ReactivityTracker::fire(tracker.compute_emits(&set_op(tuple!["users", "jon"])));
        assert_eq!(first.lock().len(), 1);
        assert_eq!(second.lock().len(), 1);
    }
}
