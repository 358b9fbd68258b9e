use crate::models::db_operations::profiles_db_operations;
use crate::DbPool;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn { profile_id: String },
    SignedOut { profile_id: Option<String> },
}

type Listener = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

struct Entry {
    id: u64,
    active: Arc<AtomicBool>,
    listener: Listener,
}

/// In-process publisher of sign-in and sign-out notifications.
#[derive(Default)]
pub struct AuthEvents {
    next_id: AtomicU64,
    entries: RwLock<Vec<Entry>>,
}

impl AuthEvents {
    pub fn new() -> Arc<Self> {
        Arc::new(AuthEvents::default())
    }

    /// Registers `listener` until the returned subscription is dropped.
    pub fn subscribe<F>(self: &Arc<Self>, listener: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        let mut entries = self.entries.write().unwrap_or_else(|poisoned| {
            log::error!("RwLock for auth listeners was poisoned on subscribe! Recovering lock.");
            poisoned.into_inner()
        });
        entries.push(Entry { id, active: Arc::clone(&active), listener: Arc::new(listener) });

        Subscription { id, active, bus: Arc::downgrade(self) }
    }

    pub fn publish(&self, event: &AuthEvent) {
        // Listeners run outside the lock so they may subscribe or unsubscribe.
        let listeners: Vec<(Arc<AtomicBool>, Listener)> = {
            let entries = self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            entries
                .iter()
                .map(|entry| (Arc::clone(&entry.active), Arc::clone(&entry.listener)))
                .collect()
        };

        for (active, listener) in listeners {
            if active.load(Ordering::Acquire) {
                listener(event);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    fn remove(&self, id: u64) {
        let mut entries = self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.retain(|entry| entry.id != id);
    }
}

/// Handle of a registered listener. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    bus: Weak<AuthEvents>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
        }
    }
}

/// Stamps `last_sign_in_at` on the profile whenever someone signs in.
pub fn subscribe_sign_in_recorder(bus: &Arc<AuthEvents>, pool: DbPool) -> Subscription {
    bus.subscribe(move |event| {
        if let AuthEvent::SignedIn { profile_id } = event {
            let result = pool
                .get()
                .map_err(|e| e.to_string())
                .and_then(|conn| profiles_db_operations::update_last_sign_in(&conn, profile_id).map_err(|e| e.to_string()));
            if let Err(e) = result {
                log::warn!("Could not record sign-in time for {}: {}", profile_id, e);
            }
        }
    })
}

pub fn subscribe_audit_log(bus: &Arc<AuthEvents>) -> Subscription {
    bus.subscribe(|event| match event {
        AuthEvent::SignedIn { profile_id } => log::info!("Profile {} signed in", profile_id),
        AuthEvent::SignedOut { profile_id: Some(id) } => log::info!("Profile {} signed out", id),
        AuthEvent::SignedOut { profile_id: None } => log::info!("Anonymous session signed out"),
    })
}
