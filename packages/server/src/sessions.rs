//! In-memory store of open report page sessions.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use safety_map_page::ReportPage;
use tokio::time::Instant;
use uuid::Uuid;

use crate::geolocation::PositionSender;

/// One visitor's page plus the pending geolocation answer slot.
pub struct Session {
    pub page: ReportPage,
    geolocation: Mutex<Option<PositionSender>>,
    last_seen: Mutex<Instant>,
}

impl Session {
    /// `geolocation` is `Some` only when the page is waiting for the
    /// client's position.
    #[must_use]
    pub fn new(page: ReportPage, geolocation: Option<PositionSender>) -> Self {
        Self {
            page,
            geolocation: Mutex::new(geolocation),
            last_seen: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(
            *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Takes the sender for the client's position. Returns `None` once the
    /// position has been delivered, or if none was requested.
    pub fn take_geolocation(&self) -> Option<PositionSender> {
        self.geolocation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Sessions keyed by id. Nothing is persisted.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<BTreeMap<Uuid, Arc<Session>>>,
}

impl SessionStore {
    /// Stores a session under a fresh id.
    pub fn insert(&self, session: Session) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(session));
        id
    }

    /// Looks a session up and marks it as active.
    #[must_use]
    pub fn get(&self, id: &Uuid) -> Option<Arc<Session>> {
        let session = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()?;
        session.touch();
        Some(session)
    }

    /// Removes a session and closes its page.
    pub fn remove(&self, id: &Uuid) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        removed.is_some_and(|session| {
            session.page.close();
            true
        })
    }

    /// Closes and drops every session not looked up for `max_idle`.
    /// Dropping a session also abandons its pending geolocation request.
    /// Returns how many were evicted.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let evicted: Vec<Arc<Session>> = {
            let mut sessions = self
                .sessions
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let idle: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, session)| session.idle_for(now) >= max_idle)
                .map(|(id, _)| *id)
                .collect();
            idle.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        for session in &evicted {
            session.page.close();
        }
        evicted.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
