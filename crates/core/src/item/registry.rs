//! Thread-safe, ordered collection of items.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use super::types::{Item, ProcessingState, Snapshot};
use crate::observer::Observer;

/// Errors returned by registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No item with this id.
    #[error("Item not found: {0}")]
    NotFound(String),

    /// An item with this id is already registered.
    #[error("Item already exists: {0}")]
    DuplicateId(String),

    /// Requested order does not match the registered id set.
    #[error("Reorder rejected: {0}")]
    OrderMismatch(String),
}

#[derive(Debug, Default)]
struct RegistryState {
    processing: bool,
    items: Vec<Item>,
}

impl RegistryState {
    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|i| i.id == id)
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            processing: self.processing,
            items: self.items.clone(),
        }
    }
}

/// Ordered item collection shared by every pipeline worker.
///
/// All mutation goes through a single lock; each externally visible
/// mutation publishes a snapshot to the observer before the lock is released.
pub struct ItemRegistry {
    state: RwLock<RegistryState>,
    observer: Arc<dyn Observer>,
}

impl ItemRegistry {
    /// Creates an empty registry publishing to `observer`.
    pub fn new(observer: Arc<dyn Observer>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            observer,
        }
    }

    /// Appends an item.
    pub async fn add(&self, item: Item) -> Result<(), RegistryError> {
        self.add_many(vec![item]).await
    }

    /// Appends several items with a single publication.
    ///
    /// Nothing is added if any id is already present or repeated.
    pub async fn add_many(&self, items: Vec<Item>) -> Result<(), RegistryError> {
        let mut state = self.state.write().await;

        let mut seen: HashSet<&str> = state.items.iter().map(|i| i.id.as_str()).collect();
        for item in &items {
            if !seen.insert(item.id.as_str()) {
                return Err(RegistryError::DuplicateId(item.id.clone()));
            }
        }

        state.items.extend(items);
        self.observer.on_state_changed(&state.snapshot());
        Ok(())
    }

    /// Removes an item, returning it if it existed.
    pub async fn remove(&self, id: &str) -> Option<Item> {
        let mut state = self.state.write().await;
        let removed = state.position(id).map(|idx| state.items.remove(idx));
        if removed.is_some() {
            self.observer.on_state_changed(&state.snapshot());
        }
        removed
    }

    /// Removes every item.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.items.clear();
        self.observer.on_state_changed(&state.snapshot());
    }

    /// Returns a copy of an item.
    pub async fn get(&self, id: &str) -> Option<Item> {
        let state = self.state.read().await;
        state.position(id).map(|idx| state.items[idx].clone())
    }

    /// Number of registered items.
    pub async fn len(&self) -> usize {
        self.state.read().await.items.len()
    }

    /// Whether the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.items.is_empty()
    }

    /// Applies `mutate` to exactly one item.
    pub async fn update_by_id<F, R>(&self, id: &str, mutate: F) -> Result<R, RegistryError>
    where
        F: FnOnce(&mut Item) -> R,
    {
        let mut state = self.state.write().await;
        let idx = state
            .position(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let out = mutate(&mut state.items[idx]);
        self.observer.on_state_changed(&state.snapshot());
        Ok(out)
    }

    /// Moves an item to `next` if the transition is allowed.
    ///
    /// Returns whether the state changed. Disallowed transitions are ignored.
    pub async fn transition(&self, id: &str, next: ProcessingState) -> Result<bool, RegistryError> {
        let mut state = self.state.write().await;
        let idx = state
            .position(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        let current = state.items[idx].state;
        if !current.can_transition_to(next) {
            debug!(item = id, from = %current, to = %next, "Ignoring state transition");
            return Ok(false);
        }

        state.items[idx].state = next;
        self.observer.on_state_changed(&state.snapshot());
        Ok(true)
    }

    /// Appends a warning to an item.
    pub async fn push_warning(&self, id: &str, warning: impl Into<String>) -> Result<(), RegistryError> {
        let warning = warning.into();
        self.update_by_id(id, move |item| item.warnings.push(warning))
            .await
    }

    /// Moves an item to `Error` with a terminal message.
    pub async fn fail(&self, id: &str, message: impl Into<String>) -> Result<(), RegistryError> {
        let message = message.into();
        self.update_by_id(id, move |item| {
            if item.state.can_transition_to(ProcessingState::Error) {
                item.state = ProcessingState::Error;
                item.error = Some(message);
            }
        })
        .await
    }

    /// Rearranges items into exactly the given id order.
    ///
    /// Rejected without changes unless `order` is a permutation of the
    /// registered ids.
    pub async fn reorder(&self, order: &[String]) -> Result<(), RegistryError> {
        let mut state = self.state.write().await;

        if order.len() != state.items.len() {
            return Err(RegistryError::OrderMismatch(format!(
                "expected {} ids, got {}",
                state.items.len(),
                order.len()
            )));
        }

        let mut seen = HashSet::with_capacity(order.len());
        for id in order {
            if !seen.insert(id.as_str()) {
                return Err(RegistryError::OrderMismatch(format!("duplicate id {}", id)));
            }
            if state.position(id).is_none() {
                return Err(RegistryError::OrderMismatch(format!("unknown id {}", id)));
            }
        }

        let mut old = std::mem::take(&mut state.items);
        let mut reordered = Vec::with_capacity(old.len());
        for id in order {
            // Presence checked above
            if let Some(idx) = old.iter().position(|i| &i.id == id) {
                reordered.push(old.swap_remove(idx));
            }
        }
        state.items = reordered;

        self.observer.on_state_changed(&state.snapshot());
        Ok(())
    }

    /// Copies of all items currently in `wanted` state, in registry order.
    pub async fn items_in_state(&self, wanted: ProcessingState) -> Vec<Item> {
        let state = self.state.read().await;
        state
            .items
            .iter()
            .filter(|i| i.state == wanted)
            .cloned()
            .collect()
    }

    /// Resets every analyzed item to `Pending` and clears results.
    pub async fn reset_all(&self) {
        let mut state = self.state.write().await;
        for item in state.items.iter_mut() {
            if item.state == ProcessingState::AnalyzingMedia {
                item.clear_results();
            } else {
                item.reset();
            }
        }
        self.observer.on_state_changed(&state.snapshot());
    }

    /// Resets items left mid-run back to `Pending`.
    ///
    /// `Completed` and `Error` items keep their outcome; items still being
    /// analyzed are untouched. Returns how many items were reset.
    pub async fn reset_unfinished(&self) -> usize {
        let mut state = self.state.write().await;
        let mut count = 0;
        for item in state.items.iter_mut() {
            if item.state.is_terminal() || item.state == ProcessingState::AnalyzingMedia {
                continue;
            }
            item.reset();
            count += 1;
        }
        self.observer.on_state_changed(&state.snapshot());
        count
    }

    /// Sets the processing flag.
    pub async fn set_processing(&self, processing: bool) {
        let mut state = self.state.write().await;
        state.processing = processing;
        self.observer.on_state_changed(&state.snapshot());
    }

    /// Whether a run is active.
    pub async fn is_processing(&self) -> bool {
        self.state.read().await.processing
    }

    /// Current processing flag and ordered items.
    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.snapshot()
    }

    /// Publishes the current snapshot without mutating anything.
    pub async fn publish(&self) {
        let state = self.state.read().await;
        self.observer.on_state_changed(&state.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::Destination;
    use crate::testing::RecordingObserver;

    fn registry() -> (ItemRegistry, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::new());
        (ItemRegistry::new(observer.clone()), observer)
    }

    fn ids(snapshot: &Snapshot) -> Vec<String> {
        snapshot.items.iter().map(|i| i.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_add_get_remove() {
        let (registry, observer) = registry();
        registry.add(Item::new("a", "/a.mkv")).await.unwrap();
        registry.add(Item::new("b", "/b.mkv")).await.unwrap();

        assert_eq!(registry.len().await, 2);
        assert_eq!(registry.get("b").await.unwrap().file_name, "b.mkv");

        let removed = registry.remove("a").await.unwrap();
        assert_eq!(removed.id, "a");
        assert!(registry.remove("a").await.is_none());
        assert_eq!(ids(&registry.snapshot().await), vec!["b"]);
        assert_eq!(observer.state_count(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let (registry, _) = registry();
        registry.add(Item::new("a", "/a.mkv")).await.unwrap();
        let err = registry.add(Item::new("a", "/other.mkv")).await.unwrap_err();
        assert_eq!(err, RegistryError::DuplicateId("a".into()));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_by_id_not_found() {
        let (registry, _) = registry();
        let err = registry.update_by_id("missing", |_| ()).await.unwrap_err();
        assert_eq!(err, RegistryError::NotFound("missing".into()));
    }

    #[tokio::test]
    async fn test_reorder_permutation() {
        let (registry, _) = registry();
        for id in ["a", "b", "c"] {
            registry.add(Item::new(id, format!("/{}.mkv", id))).await.unwrap();
        }

        let order: Vec<String> = vec!["c".into(), "a".into(), "b".into()];
        registry.reorder(&order).await.unwrap();
        assert_eq!(ids(&registry.snapshot().await), order);
    }

    #[tokio::test]
    async fn test_reorder_rejects_mismatch() {
        let (registry, _) = registry();
        for id in ["a", "b", "c"] {
            registry.add(Item::new(id, format!("/{}.mkv", id))).await.unwrap();
        }

        let bad_orders: Vec<Vec<String>> = vec![
            vec!["a".into(), "b".into()],
            vec!["a".into(), "b".into(), "x".into()],
            vec!["a".into(), "a".into(), "b".into()],
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
        ];
        for order in bad_orders {
            let result = registry.reorder(&order).await;
            assert!(matches!(result, Err(RegistryError::OrderMismatch(_))));
            assert_eq!(ids(&registry.snapshot().await), vec!["a", "b", "c"]);
        }
    }

    #[tokio::test]
    async fn test_transition_is_forward_only() {
        let (registry, _) = registry();
        registry.add(Item::new("a", "/a.mkv")).await.unwrap();

        assert!(registry.transition("a", ProcessingState::Pending).await.unwrap());
        assert!(registry
            .transition("a", ProcessingState::GeneratingMedia)
            .await
            .unwrap());
        assert!(!registry
            .transition("a", ProcessingState::GeneratingMedia)
            .await
            .unwrap());
        assert!(!registry
            .transition("a", ProcessingState::WaitingForGenerationSlot)
            .await
            .unwrap());
        assert_eq!(
            registry.get("a").await.unwrap().state,
            ProcessingState::GeneratingMedia
        );
    }

    #[tokio::test]
    async fn test_fail_sets_error() {
        let (registry, _) = registry();
        registry.add(Item::new("a", "/a.mkv")).await.unwrap();
        registry.fail("a", "No media generated").await.unwrap();

        let item = registry.get("a").await.unwrap();
        assert_eq!(item.state, ProcessingState::Error);
        assert_eq!(item.error.as_deref(), Some("No media generated"));
    }

    #[tokio::test]
    async fn test_reset_unfinished_keeps_terminal() {
        let (registry, _) = registry();
        let mut done = Item::new("done", "/done.mkv");
        done.state = ProcessingState::Completed;
        let mut mid = Item::new("mid", "/mid.mkv");
        mid.state = ProcessingState::Uploading;
        mid.warnings.push("Fastpic screenshot 1 upload failed".into());
        mid.links_mut(Destination::Fastpic).contact_sheet = "link".into();
        let analyzing = Item::new("new", "/new.mkv");

        registry.add_many(vec![done, mid, analyzing]).await.unwrap();
        assert_eq!(registry.reset_unfinished().await, 1);

        let mid = registry.get("mid").await.unwrap();
        assert_eq!(mid.state, ProcessingState::Pending);
        assert!(mid.warnings.is_empty());
        assert!(mid.results.is_empty());
        assert_eq!(
            registry.get("done").await.unwrap().state,
            ProcessingState::Completed
        );
        assert_eq!(
            registry.get("new").await.unwrap().state,
            ProcessingState::AnalyzingMedia
        );
    }

    #[tokio::test]
    async fn test_concurrent_updates_do_not_lose_writes() {
        let (registry, _) = registry();
        let registry = Arc::new(registry);
        registry.add(Item::new("a", "/a.mkv")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..50 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry
                    .update_by_id("a", |item| {
                        item.links_mut(Destination::Imgbox).set_screenshot(
                            i,
                            format!("s{}", i),
                            format!("b{}", i),
                        )
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let item = registry.get("a").await.unwrap();
        let links = item.links(Destination::Imgbox).unwrap();
        assert_eq!(links.screenshots.len(), 50);
        assert!(links.screenshots.iter().all(|s| !s.is_empty()));
    }
}
