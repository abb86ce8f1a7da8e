//! Generic fetch cache over a keyed [`Collection`].
//!
//! A `Manager` owns one collection of entities keyed by their
//! [`Entity::unique_id`] and coordinates three ways of filling it:
//!
//! - [`Manager::fetch_one`]: cache hit or a single load
//! - [`Manager::fetch_all`]: concurrent load of every listed id, then a bulk
//!   replace of the cache
//! - [`Manager::stream`]: sequential, lazy loads in id-list order
//!
//! What to load is delegated to a [`Loader`]; the manager never looks at
//! transport status codes.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::collection::Collection;
use crate::entity::Entity;
use crate::error::CacheError;

/// Source of entities for a [`Manager`].
#[async_trait]
pub trait Loader: Send + Sync + 'static {
    type Entity: Entity;

    /// Load one entity. The result must report `id` as its unique id.
    ///
    /// Failures are reported out of band; a best-effort entity is still
    /// returned.
    async fn load_one(&self, id: &str) -> Self::Entity;

    /// Every id currently known to the remote side. May be empty.
    async fn list_ids(&self) -> Vec<String>;
}

// Never held across an await.
type SharedCache<E> = Arc<RwLock<Collection<String, Arc<E>>>>;

pub struct Manager<L: Loader> {
    loader: Arc<L>,
    cache: SharedCache<L::Entity>,
}

impl<L: Loader> Manager<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader: Arc::new(loader),
            cache: Arc::new(RwLock::new(Collection::new())),
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Return the cached entity for `id`, loading it on a miss or when
    /// `force` is set.
    pub async fn fetch_one(&self, id: &str, force: bool) -> Result<Arc<L::Entity>, CacheError> {
        load_into(&*self.loader, &self.cache, id, force).await
    }

    /// Load every listed id concurrently and replace the cache with the
    /// results.
    ///
    /// An empty id list leaves the cache untouched. All loads settle before
    /// any result is inspected; an identity mismatch in any of them fails the
    /// whole call. Returns a snapshot of the cache afterwards.
    pub async fn fetch_all(
        &self,
        force: bool,
    ) -> Result<Collection<String, Arc<L::Entity>>, CacheError> {
        let ids = self.loader.list_ids().await;
        debug!(count = ids.len(), force = force, "Bulk fetch");

        let results = join_all(ids.iter().map(|id| self.fetch_one(id, force))).await;
        let fetched = results.into_iter().collect::<Result<Vec<_>, _>>()?;

        let mut cache = self.cache.write();
        if !fetched.is_empty() {
            cache.clear();
            for entity in fetched {
                cache.set(entity.unique_id(), entity);
            }
        }
        Ok(cache.clone())
    }

    /// Lazily fetch entities one at a time in id-list order.
    ///
    /// The id list is requested on first poll. Each item is yielded only
    /// after its own fetch settles. Dropping the stream skips ids not yet
    /// reached; a fetch already issued runs to completion on the runtime
    /// and still lands in the cache.
    pub fn stream(&self) -> BoxStream<'_, Result<Arc<L::Entity>, CacheError>> {
        stream::once(self.loader.list_ids())
            .flat_map(stream::iter)
            .then(move |id| {
                let loader = Arc::clone(&self.loader);
                let cache = Arc::clone(&self.cache);
                let task =
                    tokio::spawn(async move { load_into(&*loader, &cache, &id, false).await });
                async move {
                    match task.await {
                        Ok(result) => result,
                        Err(e) => Err(CacheError::Interrupted(e.to_string())),
                    }
                }
            })
            .boxed()
    }

    /// Snapshot iterator over the cached entities. Never fetches.
    pub fn iter(&self) -> std::vec::IntoIter<Arc<L::Entity>> {
        self.values().into_iter()
    }

    pub fn values(&self) -> Vec<Arc<L::Entity>> {
        self.cache.read().values()
    }

    pub fn get(&self, id: &str) -> Option<Arc<L::Entity>> {
        self.cache.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Snapshot of the whole cache.
    pub fn cache(&self) -> Collection<String, Arc<L::Entity>> {
        self.cache.read().clone()
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }

    pub fn to_json(&self) -> Value {
        let cache = self.cache.read();
        let record: Map<String, Value> = cache
            .iter()
            .map(|(id, entity)| (id.clone(), entity.to_json()))
            .collect();
        Value::Object(record)
    }
}

async fn load_into<L: Loader>(
    loader: &L,
    cache: &RwLock<Collection<String, Arc<L::Entity>>>,
    id: &str,
    force: bool,
) -> Result<Arc<L::Entity>, CacheError> {
    if !force {
        let cached = cache.read().get(id).cloned();
        if let Some(entity) = cached {
            debug!(id = %id, "Cache hit");
            return Ok(entity);
        }
    }

    debug!(id = %id, force = force, "Loading entity");
    let entity = loader.load_one(id).await;
    let actual = entity.unique_id();
    if actual != id {
        warn!(requested = %id, actual = %actual, "Loader returned an entity with a different id");
        return Err(CacheError::IdentityMismatch {
            requested: id.to_string(),
            actual,
        });
    }

    let entity = Arc::new(entity);
    cache.write().set(actual, Arc::clone(&entity));
    Ok(entity)
}

impl<'a, L: Loader> IntoIterator for &'a Manager<L> {
    type Item = Arc<L::Entity>;
    type IntoIter = std::vec::IntoIter<Arc<L::Entity>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;
    use serde_json::json;
    use tokio::sync::Barrier;

    #[derive(Debug, PartialEq)]
    struct Item {
        id: String,
        generation: usize,
    }

    impl fmt::Display for Item {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "<Item {}>", self.id)
        }
    }

    #[async_trait]
    impl Entity for Item {
        fn unique_id(&self) -> String {
            self.id.clone()
        }

        async fn fetch(&mut self) -> &mut Self {
            self
        }

        fn to_json(&self) -> Value {
            json!({ "id": self.id, "generation": self.generation })
        }
    }

    #[derive(Default)]
    struct FakeLoader {
        ids: Mutex<Vec<String>>,
        loads: AtomicUsize,
        list_calls: AtomicUsize,
        log: Mutex<Vec<String>>,
        rename: Option<(String, String)>,
        barrier: Option<Arc<Barrier>>,
        delay: Option<Duration>,
        finished: AtomicUsize,
    }

    impl FakeLoader {
        fn with_ids(ids: &[&str]) -> Self {
            Self {
                ids: Mutex::new(ids.iter().map(|s| s.to_string()).collect()),
                ..Default::default()
            }
        }

        fn set_ids(&self, ids: &[&str]) {
            *self.ids.lock() = ids.iter().map(|s| s.to_string()).collect();
        }

        fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Loader for FakeLoader {
        type Entity = Item;

        async fn load_one(&self, id: &str) -> Item {
            let generation = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
            self.log.lock().push(id.to_string());
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.finished.fetch_add(1, Ordering::SeqCst);
            let id = match &self.rename {
                Some((from, to)) if from == id => to.clone(),
                _ => id.to_string(),
            };
            Item { id, generation }
        }

        async fn list_ids(&self) -> Vec<String> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.ids.lock().clone()
        }
    }

    #[tokio::test]
    async fn test_fetch_one_caches() {
        let manager = Manager::new(FakeLoader::default());

        let first = manager.fetch_one("a", false).await.expect("fetch");
        let second = manager.fetch_one("a", false).await.expect("fetch");

        assert_eq!(manager.loader().loads(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_one_force_reloads() {
        let manager = Manager::new(FakeLoader::default());

        manager.fetch_one("a", false).await.expect("fetch");
        let forced = manager.fetch_one("a", true).await.expect("fetch");

        assert_eq!(manager.loader().loads(), 2);
        assert_eq!(forced.generation, 2);
        assert_eq!(manager.get("a").map(|e| e.generation), Some(2));
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_one_identity_mismatch() {
        let loader = FakeLoader {
            rename: Some(("a".to_string(), "z".to_string())),
            ..Default::default()
        };
        let manager = Manager::new(loader);

        let err = manager.fetch_one("a", false).await.unwrap_err();

        assert_eq!(
            err,
            CacheError::IdentityMismatch {
                requested: "a".to_string(),
                actual: "z".to_string(),
            }
        );
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_all_loads_concurrently() {
        let loader = FakeLoader {
            barrier: Some(Arc::new(Barrier::new(3))),
            ..FakeLoader::with_ids(&["a", "b", "c"])
        };
        let manager = Manager::new(loader);

        // Each load waits until all three are in flight.
        let all = tokio::time::timeout(Duration::from_secs(5), manager.fetch_all(false))
            .await
            .expect("loads should run concurrently")
            .expect("fetch_all");

        assert_eq!(all.keys(), vec!["a", "b", "c"]);
        assert_eq!(manager.loader().loads(), 3);
        assert_eq!(manager.cache(), all);
    }

    #[tokio::test]
    async fn test_fetch_all_replaces_cache() {
        let manager = Manager::new(FakeLoader::with_ids(&["a", "b"]));
        manager.fetch_one("old", false).await.expect("fetch");

        let all = manager.fetch_all(false).await.expect("fetch_all");

        assert_eq!(all.keys(), vec!["a", "b"]);
        assert!(manager.get("old").is_none());
    }

    #[tokio::test]
    async fn test_fetch_all_reuses_cached_unless_forced() {
        let manager = Manager::new(FakeLoader::with_ids(&["a", "b"]));
        manager.fetch_one("a", false).await.expect("fetch");

        manager.fetch_all(false).await.expect("fetch_all");
        assert_eq!(manager.loader().loads(), 2);

        manager.fetch_all(true).await.expect("fetch_all");
        assert_eq!(manager.loader().loads(), 4);
    }

    #[tokio::test]
    async fn test_fetch_all_empty_ids_leaves_cache() {
        let manager = Manager::new(FakeLoader::default());

        let all = manager.fetch_all(false).await.expect("fetch_all");
        assert!(all.is_empty());

        manager.fetch_one("kept", false).await.expect("fetch");
        let all = manager.fetch_all(false).await.expect("fetch_all");

        assert_eq!(all.keys(), vec!["kept"]);
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_mismatch_fails() {
        let loader = FakeLoader {
            rename: Some(("b".to_string(), "q".to_string())),
            ..FakeLoader::with_ids(&["a", "b"])
        };
        let manager = Manager::new(loader);

        let result = manager.fetch_all(false).await;

        assert!(matches!(result, Err(CacheError::IdentityMismatch { .. })));
        assert_eq!(manager.loader().loads(), 2);
        assert!(manager.get("q").is_none());
    }

    #[tokio::test]
    async fn test_sync_iteration_is_snapshot() {
        let manager = Manager::new(FakeLoader::with_ids(&["a", "b"]));
        assert_eq!(manager.iter().count(), 0);

        manager.fetch_all(false).await.expect("fetch_all");
        let loads = manager.loader().loads();

        let first: Vec<String> = manager.iter().map(|e| e.unique_id()).collect();
        let second: Vec<String> = (&manager).into_iter().map(|e| e.unique_id()).collect();

        assert_eq!(first, vec!["a", "b"]);
        assert_eq!(first, second);
        assert_eq!(manager.loader().loads(), loads);
    }

    #[tokio::test]
    async fn test_stream_yields_in_order_lazily() {
        let manager = Manager::new(FakeLoader::with_ids(&["x", "y"]));
        let mut stream = manager.stream();
        assert_eq!(manager.loader().list_calls.load(Ordering::SeqCst), 0);

        let x = stream.next().await.expect("item").expect("fetch");
        assert_eq!(x.unique_id(), "x");
        assert_eq!(manager.loader().loads(), 1);

        let y = stream.next().await.expect("item").expect("fetch");
        assert_eq!(y.unique_id(), "y");
        assert_eq!(manager.loader().loads(), 2);

        assert!(stream.next().await.is_none());
        assert_eq!(manager.loader().list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*manager.loader().log.lock(), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_stream_uses_cache() {
        let manager = Manager::new(FakeLoader::with_ids(&["x"]));
        manager.fetch_one("x", false).await.expect("fetch");

        let items: Vec<_> = manager.stream().collect().await;

        assert_eq!(items.len(), 1);
        assert_eq!(manager.loader().loads(), 1);
    }

    #[tokio::test]
    async fn test_dropped_stream_abandons_remaining() {
        let manager = Manager::new(FakeLoader::with_ids(&["x", "y", "z"]));
        {
            let mut stream = manager.stream();
            stream.next().await.expect("item").expect("fetch");
        }
        assert_eq!(manager.loader().loads(), 1);

        manager.loader().set_ids(&["y"]);
        manager.fetch_all(false).await.expect("fetch_all");
        assert_eq!(manager.cache().keys(), vec!["y"]);
    }

    #[tokio::test]
    async fn test_stream_in_flight_fetch_survives_drop() {
        let loader = FakeLoader {
            delay: Some(Duration::from_millis(50)),
            ..FakeLoader::with_ids(&["x", "y"])
        };
        let manager = Manager::new(loader);
        {
            let mut stream = manager.stream();
            let next = tokio::time::timeout(Duration::from_millis(10), stream.next()).await;
            assert!(next.is_err(), "load should still be pending");
        }

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(manager.loader().loads(), 1);
        assert_eq!(manager.loader().finished.load(Ordering::SeqCst), 1);
        assert!(manager.get("x").is_some());
        assert!(manager.get("y").is_none());
    }

    #[tokio::test]
    async fn test_to_json() {
        let manager = Manager::new(FakeLoader::default());
        manager.fetch_one("a", false).await.expect("fetch");

        assert_eq!(
            manager.to_json(),
            json!({ "a": { "id": "a", "generation": 1 } })
        );
    }
}
