//! Observable settings container shared by every UI consumer.
//!
//! The UI holds one `Arc<SettingsStore>`.  Any consumer may read or write any
//! field; every write that changes the record bumps a revision counter and
//! synchronously notifies the registered observers with a snapshot of the new
//! record.  The autosave worker is one such observer.
//!
//! # Field bindings
//!
//! [`SettingsStore::refs`] hands out a [`SettingsRefs`] bundle with one
//! [`FieldRef`] per top-level field.  A `FieldRef` is a live binding:
//!
//! ```rust
//! use std::sync::Arc;
//! use kubedesk_core::domain::settings::ColorScheme;
//! use kubedesk_core::domain::store::SettingsStore;
//!
//! let store = Arc::new(SettingsStore::new());
//! let refs = store.refs();
//!
//! refs.appearance.update(|a| a.color_scheme = Some(ColorScheme::Dark));
//! assert_eq!(store.snapshot().color_scheme(), ColorScheme::Dark);
//! assert_eq!(store.revision(), 1);
//! ```
//!
//! # Locking
//!
//! The record sits behind a `parking_lot::RwLock`; the observer list behind a
//! `parking_lot::Mutex`.  Neither lock is held while observers run, so an
//! observer may read the store (or even write to it) without deadlocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::trace;

use super::settings::{
    AppearanceSettings, ContextSettings, Settings, ShellSettings, StructuredLogViewerSettings,
    TabProviderSettings, UpdateSettings,
};

/// Handle returned by [`SettingsStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Notification delivered to observers after a mutation.
#[derive(Debug, Clone)]
pub struct SettingsChange {
    /// Revision of the record after the mutation.
    pub revision: u64,
    /// The record as it was right after the mutation.
    pub settings: Settings,
}

type Observer = Arc<dyn Fn(&SettingsChange) + Send + Sync>;

struct StoreState {
    settings: Settings,
    revision: u64,
}

/// In-memory settings record with change notification.
pub struct SettingsStore {
    state: RwLock<StoreState>,
    observers: Mutex<Vec<(SubscriptionId, Observer)>>,
    next_subscription: AtomicU64,
}

impl SettingsStore {
    /// Creates a store holding [`Settings::default()`] at revision 0.
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    /// Creates a store holding `settings` at revision 0.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            state: RwLock::new(StoreState {
                settings,
                revision: 0,
            }),
            observers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Returns a clone of the current record.
    pub fn snapshot(&self) -> Settings {
        self.state.read().settings.clone()
    }

    /// Returns the snapshot together with its revision, read atomically.
    pub fn versioned_snapshot(&self) -> (u64, Settings) {
        let state = self.state.read();
        (state.revision, state.settings.clone())
    }

    /// Number of mutations applied since the store was created.
    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// Runs `f` against the current record without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&Settings) -> R) -> R {
        f(&self.state.read().settings)
    }

    /// Mutates the record in place.
    ///
    /// If the record differs afterwards, the revision is bumped and every
    /// observer is notified.  Writing a value equal to the current one is not
    /// a mutation and notifies nobody.
    pub fn update<R>(&self, f: impl FnOnce(&mut Settings) -> R) -> R {
        let (result, change) = {
            let mut state = self.state.write();
            let before = state.settings.clone();
            let result = f(&mut state.settings);
            if state.settings == before {
                (result, None)
            } else {
                state.revision += 1;
                let change = SettingsChange {
                    revision: state.revision,
                    settings: state.settings.clone(),
                };
                (result, Some(change))
            }
        };

        if let Some(change) = change {
            self.notify(&change);
        }
        result
    }

    /// Replaces the whole record, notifying observers if it changed.
    pub fn replace(&self, settings: Settings) {
        self.update(move |current| *current = settings);
    }

    /// Replaces the whole record without bumping the revision or notifying.
    ///
    /// Only the loader uses this, before the save observer is registered.
    pub fn replace_silently(&self, settings: Settings) {
        self.state.write().settings = settings;
    }

    /// Registers an observer called after every mutation.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&SettingsChange) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, Arc::new(observer)));
        id
    }

    /// Removes an observer.  Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    /// Live bindings to every top-level field.
    pub fn refs(self: &Arc<Self>) -> SettingsRefs {
        SettingsRefs {
            last_context: FieldRef::new(self, |s| &s.last_context, |s| &mut s.last_context),
            last_namespace: FieldRef::new(self, |s| &s.last_namespace, |s| &mut s.last_namespace),
            tab_provider: FieldRef::new(self, |s| &s.tab_provider, |s| &mut s.tab_provider),
            shell: FieldRef::new(self, |s| &s.shell, |s| &mut s.shell),
            structured_log_viewer: FieldRef::new(
                self,
                |s| &s.structured_log_viewer,
                |s| &mut s.structured_log_viewer,
            ),
            context_settings: FieldRef::new(
                self,
                |s| &s.context_settings,
                |s| &mut s.context_settings,
            ),
            collapsed_navigation_groups: FieldRef::new(
                self,
                |s| &s.collapsed_navigation_groups,
                |s| &mut s.collapsed_navigation_groups,
            ),
            appearance: FieldRef::new(self, |s| &s.appearance, |s| &mut s.appearance),
            updates: FieldRef::new(self, |s| &s.updates, |s| &mut s.updates),
        }
    }

    fn notify(&self, change: &SettingsChange) {
        // Clone the list so observers run without the lock held.
        let observers: Vec<Observer> = self
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        trace!(
            revision = change.revision,
            observers = observers.len(),
            "settings changed"
        );
        for observer in observers {
            observer(change);
        }
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

// ── Field bindings ────────────────────────────────────────────────────────────

/// Live read/write binding to one field of the shared record.
pub struct FieldRef<T> {
    store: Arc<SettingsStore>,
    read: fn(&Settings) -> &T,
    write: fn(&mut Settings) -> &mut T,
}

impl<T> Clone for FieldRef<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            read: self.read,
            write: self.write,
        }
    }
}

impl<T: Clone> FieldRef<T> {
    fn new(
        store: &Arc<SettingsStore>,
        read: fn(&Settings) -> &T,
        write: fn(&mut Settings) -> &mut T,
    ) -> Self {
        Self {
            store: Arc::clone(store),
            read,
            write,
        }
    }

    /// Current value of the field.
    pub fn get(&self) -> T {
        let read = self.read;
        self.store.read(|s| read(s).clone())
    }

    /// Assigns the field, notifying observers if the value changed.
    pub fn set(&self, value: T) {
        let write = self.write;
        self.store.update(move |s| *write(s) = value);
    }

    /// Mutates the field in place, notifying observers if the value changed.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let write = self.write;
        self.store.update(move |s| f(write(s)))
    }

    /// The store this binding writes through.
    pub fn store(&self) -> &Arc<SettingsStore> {
        &self.store
    }
}

/// One [`FieldRef`] per top-level settings field.
#[derive(Clone)]
pub struct SettingsRefs {
    pub last_context: FieldRef<Option<String>>,
    pub last_namespace: FieldRef<Option<String>>,
    pub tab_provider: FieldRef<TabProviderSettings>,
    pub shell: FieldRef<ShellSettings>,
    pub structured_log_viewer: FieldRef<StructuredLogViewerSettings>,
    pub context_settings: FieldRef<Vec<ContextSettings>>,
    pub collapsed_navigation_groups: FieldRef<Vec<String>>,
    pub appearance: FieldRef<AppearanceSettings>,
    pub updates: FieldRef<UpdateSettings>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::settings::ColorScheme;
    use std::sync::Mutex as StdMutex;

    fn recording_store() -> (Arc<SettingsStore>, Arc<StdMutex<Vec<SettingsChange>>>) {
        let store = Arc::new(SettingsStore::new());
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe(move |change| sink.lock().unwrap().push(change.clone()));
        (store, seen)
    }

    #[test]
    fn test_new_store_holds_defaults_at_revision_zero() {
        let store = SettingsStore::new();
        assert_eq!(store.snapshot(), Settings::default());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_update_notifies_observer_with_new_snapshot() {
        // Arrange
        let (store, seen) = recording_store();

        // Act
        store.update(|s| s.last_context = Some("prod".into()));

        // Assert
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].revision, 1);
        assert_eq!(seen[0].settings.last_context.as_deref(), Some("prod"));
    }

    #[test]
    fn test_update_with_equal_value_does_not_notify() {
        let (store, seen) = recording_store();

        store.update(|s| s.shell.executable = Some("/bin/sh".into()));

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_update_returns_closure_result() {
        let store = SettingsStore::new();
        let now_favorite = store.update(|s| s.toggle_favorite_namespace("dev", "web"));
        assert!(now_favorite);
    }

    #[test]
    fn test_replace_silently_does_not_notify_or_bump_revision() {
        let (store, seen) = recording_store();
        let mut loaded = Settings::default();
        loaded.last_namespace = Some("kube-system".into());

        store.replace_silently(loaded.clone());

        assert_eq!(store.snapshot(), loaded);
        assert_eq!(store.revision(), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_replace_notifies_when_record_changes() {
        let (store, seen) = recording_store();
        let mut next = Settings::default();
        next.appearance.color_scheme = Some(ColorScheme::Light);

        store.replace(next);

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        // Arrange
        let store = Arc::new(SettingsStore::new());
        let count = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&count);
        let id = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // Act
        store.update(|s| s.last_context = Some("a".into()));
        assert!(store.unsubscribe(id));
        store.update(|s| s.last_context = Some("b".into()));

        // Assert
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(store.observer_count(), 0);
        assert!(!store.unsubscribe(id));
    }

    #[test]
    fn test_observer_can_read_store_without_deadlock() {
        let store = Arc::new(SettingsStore::new());
        let inner = Arc::clone(&store);
        let observed = Arc::new(StdMutex::new(None));
        let slot = Arc::clone(&observed);
        store.subscribe(move |_| {
            *slot.lock().unwrap() = Some(inner.revision());
        });

        store.update(|s| s.last_namespace = Some("ns".into()));

        assert_eq!(*observed.lock().unwrap(), Some(1));
    }

    #[test]
    fn test_field_ref_reads_current_value() {
        let store = Arc::new(SettingsStore::new());
        let refs = store.refs();

        store.update(|s| s.last_namespace = Some("monitoring".into()));

        assert_eq!(refs.last_namespace.get().as_deref(), Some("monitoring"));
    }

    #[test]
    fn test_field_ref_set_writes_through_and_notifies() {
        // Arrange
        let (store, seen) = recording_store();
        let refs = store.refs();

        // Act
        refs.appearance.set(AppearanceSettings {
            color_scheme: Some(ColorScheme::Dark),
            ..AppearanceSettings::default()
        });

        // Assert
        assert_eq!(store.snapshot().color_scheme(), ColorScheme::Dark);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        // Observers get the full record, not only the changed field
        assert_eq!(seen[0].settings.shell, ShellSettings::default());
    }

    #[test]
    fn test_field_ref_update_mutates_in_place() {
        let store = Arc::new(SettingsStore::new());
        let refs = store.refs();

        refs.collapsed_navigation_groups
            .update(|groups| groups.push("Storage".into()));
        refs.collapsed_navigation_groups
            .update(|groups| groups.push("Network".into()));

        assert_eq!(
            store.snapshot().collapsed_navigation_groups,
            vec!["Storage", "Network"]
        );
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn test_cloned_refs_share_the_same_store() {
        let store = Arc::new(SettingsStore::new());
        let refs = store.refs();
        let other = refs.clone();

        refs.tab_provider.set(TabProviderSettings::with_height(30.0));

        assert_eq!(other.tab_provider.get().height, Some(serde_json::Number::from(30)));
        assert!(Arc::ptr_eq(other.tab_provider.store(), &store));
    }

    #[test]
    fn test_versioned_snapshot_pairs_revision_with_record() {
        let store = SettingsStore::new();
        store.update(|s| s.last_context = Some("x".into()));

        let (revision, settings) = store.versioned_snapshot();

        assert_eq!(revision, 1);
        assert_eq!(settings.last_context.as_deref(), Some("x"));
    }
}
