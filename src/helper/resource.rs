//! Load-on-dependency-change state holder used by every data-backed page.
//!
//! A [`Resource`] keeps the last successfully loaded value together with a
//! loading flag and the last error message. Each load is tagged with a
//! [`Ticket`]; only the ticket of the newest load may settle the state, so a
//! slow response for an old dependency cannot overwrite a newer one.

use serde::Serialize;
use std::fmt::Display;

/// Identifies one load request issued by [`Resource::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
}

/// Read-only view of a resource handed to templates and JSON responses.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Snapshot<T> {
    pub data: T,
    /// True only while a [`Resource`] load is pending. Pages and the JSON
    /// API resolve through [`fetch_snapshot`], so served snapshots are
    /// always `false` here.
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Snapshot<T> {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug)]
pub struct Resource<D, T> {
    dependency: Option<D>,
    data: T,
    loading: bool,
    error: Option<String>,
    generation: u64,
}

impl<D, T> Default for Resource<D, T>
where
    D: PartialEq + Clone,
    T: Clone + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<D, T> Resource<D, T>
where
    D: PartialEq + Clone,
    T: Clone + Default,
{
    /// A fresh resource holds the empty default and is already loading.
    pub fn new() -> Self {
        Resource {
            dependency: None,
            data: T::default(),
            loading: true,
            error: None,
            generation: 0,
        }
    }

    /// True when `dependency` differs from the one of the last load.
    pub fn needs_load(&self, dependency: &D) -> bool {
        self.dependency.as_ref() != Some(dependency)
    }

    pub fn begin(&mut self, dependency: D) -> Ticket {
        self.generation += 1;
        self.dependency = Some(dependency);
        self.loading = true;
        Ticket { generation: self.generation }
    }

    /// Applies the outcome of a load. Returns false and leaves the state
    /// untouched when the ticket has been superseded by a newer `begin`.
    pub fn settle<E: Display>(&mut self, ticket: Ticket, result: Result<T, E>) -> bool {
        if ticket.generation != self.generation {
            log::debug!(
                "Discarding stale response (generation {} < {})",
                ticket.generation,
                self.generation
            );
            return false;
        }

        match result {
            Ok(data) => {
                self.data = data;
                self.error = None;
            }
            Err(e) => {
                let message = e.to_string();
                log::error!("Resource load failed: {}", message);
                self.error = Some(message);
            }
        }
        self.loading = false;
        true
    }

    /// Runs `fetch` once if the dependency changed. Returns whether a fetch ran.
    pub fn load_if_changed<E, F>(&mut self, dependency: D, fetch: F) -> bool
    where
        E: Display,
        F: FnOnce(&D) -> Result<T, E>,
    {
        if !self.needs_load(&dependency) {
            return false;
        }
        let ticket = self.begin(dependency.clone());
        let result = fetch(&dependency);
        self.settle(ticket, result);
        true
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        Snapshot {
            data: self.data.clone(),
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

/// Loads a resource once for a single request and returns its snapshot.
pub fn fetch_snapshot<D, T, E, F>(dependency: D, fetch: F) -> Snapshot<T>
where
    D: PartialEq + Clone,
    T: Clone + Default,
    E: Display,
    F: FnOnce(&D) -> Result<T, E>,
{
    let mut resource = Resource::<D, T>::new();
    resource.load_if_changed(dependency, fetch);
    resource.snapshot()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_loading_with_empty_default() {
        let resource: Resource<String, Vec<i32>> = Resource::new();
        assert!(resource.is_loading());
        assert!(resource.data().is_empty());
        assert_eq!(resource.error(), None);
    }

    #[test]
    fn fetches_once_per_dependency_change() {
        let mut resource: Resource<String, Vec<String>> = Resource::new();
        let mut calls = 0;

        assert!(resource.load_if_changed("a".to_string(), |dep| {
            calls += 1;
            Ok::<_, String>(vec![dep.clone()])
        }));
        assert!(!resource.load_if_changed("a".to_string(), |_| {
            calls += 1;
            Ok::<_, String>(vec![])
        }));
        assert!(resource.load_if_changed("b".to_string(), |dep| {
            calls += 1;
            Ok::<_, String>(vec![dep.clone()])
        }));

        assert_eq!(calls, 2);
        assert_eq!(resource.data(), &vec!["b".to_string()]);
        assert!(!resource.is_loading());
    }

    #[test]
    fn failure_keeps_previous_data_and_records_message() {
        let mut resource: Resource<u32, Vec<u32>> = Resource::new();
        resource.load_if_changed(1, |_| Ok::<_, String>(vec![1, 2]));
        resource.load_if_changed(2, |_| Err::<Vec<u32>, _>("connection refused"));

        assert_eq!(resource.data(), &vec![1, 2]);
        assert_eq!(resource.error(), Some("connection refused"));
        assert!(!resource.is_loading());
    }

    #[test]
    fn success_clears_previous_error() {
        let mut resource: Resource<u32, Vec<u32>> = Resource::new();
        resource.load_if_changed(1, |_| Err::<Vec<u32>, _>("boom"));
        resource.load_if_changed(2, |_| Ok::<_, String>(vec![7]));
        assert_eq!(resource.error(), None);
        assert_eq!(resource.data(), &vec![7]);
    }

    #[test]
    fn stale_ticket_cannot_overwrite_newer_state() {
        let mut resource: Resource<&'static str, String> = Resource::new();
        let old = resource.begin("old");
        let new = resource.begin("new");

        assert!(resource.settle(new, Ok::<_, String>("fresh".to_string())));
        assert!(!resource.settle(old, Ok::<_, String>("stale".to_string())));
        assert_eq!(resource.data(), "fresh");
    }

    #[test]
    fn stale_ticket_does_not_end_newer_loading() {
        let mut resource: Resource<u8, u8> = Resource::new();
        let old = resource.begin(1);
        let _new = resource.begin(2);
        resource.settle(old, Ok::<_, String>(1));
        assert!(resource.is_loading());
    }

    #[test]
    fn fetch_snapshot_reports_error_with_default_data() {
        let snapshot: Snapshot<Vec<u8>> = fetch_snapshot((), |_| Err::<Vec<u8>, _>("offline"));
        assert_eq!(snapshot.data, Vec::<u8>::new());
        assert_eq!(snapshot.error.as_deref(), Some("offline"));
        assert!(!snapshot.loading);
    }

    #[test]
    fn fetch_snapshot_is_never_loading() {
        let snapshot = fetch_snapshot((), |_| Ok::<_, &str>(vec![1u8, 2]));
        assert!(!snapshot.loading);
        assert!(snapshot.is_ok());
    }
}
