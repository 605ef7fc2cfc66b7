use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::dataset::Dataset;

/// One uploaded sheet and its derived dropdown data, addressed by an opaque
/// upload id. Never mutated after it is published to the store; readers
/// share it through an `Arc`.
#[derive(Debug)]
pub struct Session {
    /// Opaque, unguessable identifier handed back to the client.
    pub upload_id: String,

    /// The parsed, immutable dataset.
    pub dataset: Dataset,

    /// Distinct dealer names, cached for the dealer dropdown.
    pub dealers: Vec<String>,

    /// Distinct month labels in calendar order, cached for the month dropdown.
    pub months: Vec<String>,

    // Insertion stamp, used for oldest-first eviction.
    stamp: u64,
}

impl Session {
    fn new(upload_id: String, dataset: Dataset, stamp: u64) -> Self {
        let dealers = dataset.dealer_names();
        let months = dataset.month_labels();
        Session {
            upload_id,
            dataset,
            dealers,
            months,
            stamp,
        }
    }
}

/// Process-wide map of live upload sessions.
///
/// Writes for different uploads never contend for long: the map is only
/// locked around insert/lookup, and the datasets themselves are immutable.
/// The store is capped; inserting past the cap evicts the oldest session,
/// so a long-running process cannot grow without bound. An evicted id
/// simply produces `SessionNotFound` and the user re-uploads.
#[derive(Debug)]
pub struct SessionStore {
    inner: RwLock<HashMap<String, Arc<Session>>>,
    max_sessions: usize,
    next_stamp: AtomicU64,
}

impl SessionStore {
    /// Create a store holding at most `max_sessions` uploads (minimum 1).
    pub fn new(max_sessions: usize) -> Self {
        SessionStore {
            inner: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
            next_stamp: AtomicU64::new(0),
        }
    }

    /// Publish a parsed dataset as a new session and return it.
    ///
    /// The id is a random UUID v4 in compact hex form, so ids cannot be
    /// enumerated by counting.
    pub fn put(&self, dataset: Dataset) -> Arc<Session> {
        let upload_id = Uuid::new_v4().simple().to_string();
        let stamp = self.next_stamp.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(Session::new(upload_id.clone(), dataset, stamp));

        let mut map = self.inner.write().unwrap();
        while map.len() >= self.max_sessions {
            let oldest = map
                .iter()
                .min_by_key(|(_, s)| s.stamp)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    map.remove(&id);
                    log::info!("evicted session {id} (store at capacity {})", self.max_sessions);
                }
                None => break,
            }
        }
        map.insert(upload_id, Arc::clone(&session));
        session
    }

    /// Look up a session by upload id.
    pub fn get(&self, upload_id: &str) -> Option<Arc<Session>> {
        self.inner.read().unwrap().get(upload_id).cloned()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
