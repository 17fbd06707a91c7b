use crate::common::Keyed;
use crate::errors::FlatdbResult;
use crate::index::avl_tree::AvlTree;
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared, lock-guarded balanced index over keyed elements.
///
/// # Purpose
/// `BalancedIndex` is the thread-safe form of [`AvlTree`]: a cloneable handle
/// whose clones all address the same tree. Every public operation acquires a
/// single tree-wide exclusive lock for its full duration: coarse mutual
/// exclusion, with readers not distinguished from writers.
///
/// # Characteristics
/// - **Thread-Safe**: can be cloned and shared freely across threads
/// - **Key-Ordered**: elements are ordered by [`Keyed::key`], unique per element
/// - **Copy Semantics**: elements are stored by value; lookups hand back clones,
///   so no reference into the tree can outlive a node
/// - **Balanced**: O(log n) insert, lookup, and removal under any workload
///
/// A caller that owns its tree exclusively and wants to skip the locking can
/// use [`AvlTree`] directly and serialize access itself.
#[derive(Debug)]
pub struct BalancedIndex<T> {
    inner: Arc<BalancedIndexInner<T>>,
}

impl<T> Clone for BalancedIndex<T> {
    fn clone(&self) -> Self {
        BalancedIndex {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[derive(Debug)]
struct BalancedIndexInner<T> {
    tree: Mutex<AvlTree<T>>,
}

impl<T: Keyed + Clone + Send + 'static> BalancedIndex<T> {
    /// Creates an empty index.
    pub fn new() -> Self {
        BalancedIndex {
            inner: Arc::new(BalancedIndexInner {
                tree: Mutex::new(AvlTree::new()),
            }),
        }
    }

    /// Inserts an element keyed by its own content.
    ///
    /// Rejects with `DuplicateKey` if the key is already live; the index is
    /// left unchanged and the first write wins.
    pub fn insert(&self, element: T) -> FlatdbResult<()> {
        self.inner.tree.lock().insert(element)
    }

    /// Returns a copy of the element stored under `key`.
    pub fn get(&self, key: i64) -> Option<T> {
        self.inner.tree.lock().get(key).cloned()
    }

    /// Returns whether an element with `key` is present.
    pub fn contains_key(&self, key: i64) -> bool {
        self.inner.tree.lock().contains_key(key)
    }

    /// Swaps the element stored under `key` for `element`, returning the old
    /// one. The replacement must carry the same key.
    pub fn replace(&self, key: i64, element: T) -> FlatdbResult<T> {
        self.inner.tree.lock().replace(key, element)
    }

    /// Removes the element stored under `key` and returns it.
    pub fn remove(&self, key: i64) -> FlatdbResult<T> {
        self.inner.tree.lock().remove(key)
    }

    /// Removes the element whose key equals `element.key()`.
    pub fn remove_element(&self, element: &T) -> FlatdbResult<T> {
        self.inner.tree.lock().remove_element(element)
    }

    /// Visits every element in ascending key order.
    ///
    /// The lock is held for the whole walk, so the visited snapshot is
    /// consistent and `visit` cannot re-enter the index without deadlocking.
    pub fn for_each<F: FnMut(&T)>(&self, visit: F) {
        self.inner.tree.lock().for_each(visit)
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.inner.tree.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.tree.lock().is_empty()
    }

    /// Drops every element, leaving an empty, reusable index.
    pub fn clear(&self) {
        self.inner.tree.lock().clear()
    }
}

impl<T: Keyed + Clone + Send + 'static> Default for BalancedIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}
