use crate::common::Keyed;
use crate::errors::{ErrorKind, FlatdbError, FlatdbResult};
use std::cmp::max;

type Link<T> = Option<Box<AvlNode<T>>>;

/// A node in the AVL tree.
///
/// Each child is owned exclusively by its parent; there is no sharing and
/// no parent pointer. `height` is cached and maintained on every structural
/// change so balance decisions never re-measure subtrees.
#[derive(Debug)]
struct AvlNode<T> {
    key: i64,
    height: i32,
    element: T,
    left: Link<T>,
    right: Link<T>,
}

impl<T> AvlNode<T> {
    fn new(key: i64, element: T) -> Self {
        AvlNode {
            key,
            height: 1,
            element,
            left: None,
            right: None,
        }
    }

    fn update_height(&mut self) {
        self.height = 1 + max(height(&self.left), height(&self.right));
    }

    fn balance_factor(&self) -> i32 {
        height(&self.left) - height(&self.right)
    }
}

fn height<T>(link: &Link<T>) -> i32 {
    link.as_ref().map_or(0, |node| node.height)
}

fn balance<T>(link: &Link<T>) -> i32 {
    link.as_ref().map_or(0, |node| node.balance_factor())
}

/// Height-balanced binary search tree over keyed elements.
///
/// # Purpose
/// `AvlTree` is the unsynchronized core of the balanced index: a classic AVL
/// tree ordered by [`Keyed::key`], guaranteeing O(log n) insert, lookup, and
/// removal under arbitrary operation sequences. Keys are unique; an insert
/// that collides with a live key is rejected without mutation.
///
/// # Thread safety
/// None. All mutating operations take `&mut self`; a caller that shares a
/// tree across threads must serialize access externally. The shared,
/// lock-guarded form is [`BalancedIndex`](crate::index::BalancedIndex).
///
/// # Ownership
/// The tree owns its nodes and the nodes own their elements. Removing an
/// element hands it back to the caller; clearing or dropping the tree drops
/// every remaining element exactly once.
#[derive(Debug)]
pub struct AvlTree<T> {
    root: Link<T>,
    len: usize,
}

impl<T: Keyed> AvlTree<T> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        AvlTree { root: None, len: 0 }
    }

    /// Inserts an element keyed by its own content.
    ///
    /// Rejects with `DuplicateKey` if an element with the same key is already
    /// present; the tree is not mutated and the first write wins.
    pub fn insert(&mut self, element: T) -> FlatdbResult<()> {
        let key = element.key();
        let (root, result) = Self::insert_at(self.root.take(), key, element);
        self.root = root;
        if result.is_ok() {
            self.len += 1;
        }
        result
    }

    /// Returns a reference to the element stored under `key`.
    pub fn get(&self, key: i64) -> Option<&T> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            if key < node.key {
                current = node.left.as_deref();
            } else if key > node.key {
                current = node.right.as_deref();
            } else {
                return Some(&node.element);
            }
        }
        None
    }

    /// Returns whether an element with `key` is present.
    pub fn contains_key(&self, key: i64) -> bool {
        self.get(key).is_some()
    }

    /// Swaps the element stored under `key` for `element`, returning the old
    /// one. The replacement must carry the same key (`KeyMismatch` otherwise);
    /// the tree's shape is untouched.
    pub fn replace(&mut self, key: i64, element: T) -> FlatdbResult<T> {
        if element.key() != key {
            return Err(FlatdbError::new(
                &format!(
                    "replacement element has key {} but {} was addressed",
                    element.key(),
                    key
                ),
                ErrorKind::KeyMismatch,
            ));
        }
        match self.get_mut(key) {
            Some(slot) => Ok(std::mem::replace(slot, element)),
            None => Err(FlatdbError::new(
                &format!("no element with key {}", key),
                ErrorKind::NotFound,
            )),
        }
    }

    /// Removes the element stored under `key` and returns it.
    pub fn remove(&mut self, key: i64) -> FlatdbResult<T> {
        let (root, result) = Self::remove_at(self.root.take(), key);
        self.root = root;
        if result.is_ok() {
            self.len -= 1;
        }
        result
    }

    /// Removes the element whose key equals `element.key()`.
    pub fn remove_element(&mut self, element: &T) -> FlatdbResult<T> {
        self.remove(element.key())
    }

    /// Visits every element in ascending key order.
    pub fn for_each<F: FnMut(&T)>(&self, mut visit: F) {
        Self::walk(&self.root, &mut visit);
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every element, leaving an empty, reusable tree.
    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    fn get_mut(&mut self, key: i64) -> Option<&mut T> {
        let mut current = self.root.as_deref_mut();
        while let Some(node) = current {
            if key < node.key {
                current = node.left.as_deref_mut();
            } else if key > node.key {
                current = node.right.as_deref_mut();
            } else {
                return Some(&mut node.element);
            }
        }
        None
    }

    fn walk<F: FnMut(&T)>(link: &Link<T>, visit: &mut F) {
        if let Some(node) = link {
            Self::walk(&node.left, visit);
            visit(&node.element);
            Self::walk(&node.right, visit);
        }
    }

    fn insert_at(link: Link<T>, key: i64, element: T) -> (Link<T>, FlatdbResult<()>) {
        match link {
            None => (Some(Box::new(AvlNode::new(key, element))), Ok(())),
            Some(mut node) => {
                if key < node.key {
                    let (child, result) = Self::insert_at(node.left.take(), key, element);
                    node.left = child;
                    match result {
                        Ok(()) => (Some(Self::rebalanced(node)), Ok(())),
                        err => (Some(node), err),
                    }
                } else if key > node.key {
                    let (child, result) = Self::insert_at(node.right.take(), key, element);
                    node.right = child;
                    match result {
                        Ok(()) => (Some(Self::rebalanced(node)), Ok(())),
                        err => (Some(node), err),
                    }
                } else {
                    let err = FlatdbError::new(
                        &format!("an element with key {} already exists", key),
                        ErrorKind::DuplicateKey,
                    );
                    (Some(node), Err(err))
                }
            }
        }
    }

    fn remove_at(link: Link<T>, key: i64) -> (Link<T>, FlatdbResult<T>) {
        match link {
            None => (
                None,
                Err(FlatdbError::new(
                    &format!("no element with key {}", key),
                    ErrorKind::NotFound,
                )),
            ),
            Some(mut node) => {
                if key < node.key {
                    let (child, result) = Self::remove_at(node.left.take(), key);
                    node.left = child;
                    match result {
                        Ok(element) => (Some(Self::rebalanced(node)), Ok(element)),
                        err => (Some(node), err),
                    }
                } else if key > node.key {
                    let (child, result) = Self::remove_at(node.right.take(), key);
                    node.right = child;
                    match result {
                        Ok(element) => (Some(Self::rebalanced(node)), Ok(element)),
                        err => (Some(node), err),
                    }
                } else {
                    let replacement = match (node.left.take(), node.right.take()) {
                        (None, None) => None,
                        (Some(left), None) => Some(left),
                        (None, Some(right)) => Some(right),
                        (Some(left), Some(right)) => {
                            // the in-order successor replaces the removed node
                            let (mut successor, rest) = Self::take_min(right);
                            successor.left = Some(left);
                            successor.right = rest;
                            Some(Self::rebalanced(successor))
                        }
                    };
                    (replacement, Ok(node.element))
                }
            }
        }
    }

    /// Unlinks the minimum node of the subtree rooted at `node`, returning it
    /// together with the rebalanced remainder.
    fn take_min(mut node: Box<AvlNode<T>>) -> (Box<AvlNode<T>>, Link<T>) {
        match node.left.take() {
            None => {
                let rest = node.right.take();
                (node, rest)
            }
            Some(left) => {
                let (min, remainder) = Self::take_min(left);
                node.left = remainder;
                (min, Some(Self::rebalanced(node)))
            }
        }
    }

    /// Restores the AVL invariant at `node` after a child subtree changed
    /// height, using single or double rotations chosen by comparing child
    /// subtree heights.
    fn rebalanced(mut node: Box<AvlNode<T>>) -> Box<AvlNode<T>> {
        node.update_height();
        let factor = node.balance_factor();
        if factor > 1 {
            if balance(&node.left) < 0 {
                // left-right: first straighten the left child
                node.left = node.left.take().map(Self::rotate_left);
            }
            Self::rotate_right(node)
        } else if factor < -1 {
            if balance(&node.right) > 0 {
                // right-left: first straighten the right child
                node.right = node.right.take().map(Self::rotate_right);
            }
            Self::rotate_left(node)
        } else {
            node
        }
    }

    fn rotate_right(mut node: Box<AvlNode<T>>) -> Box<AvlNode<T>> {
        match node.left.take() {
            Some(mut pivot) => {
                node.left = pivot.right.take();
                node.update_height();
                pivot.right = Some(node);
                pivot.update_height();
                pivot
            }
            None => node,
        }
    }

    fn rotate_left(mut node: Box<AvlNode<T>>) -> Box<AvlNode<T>> {
        match node.right.take() {
            Some(mut pivot) => {
                node.right = pivot.left.take();
                node.update_height();
                pivot.left = Some(node);
                pivot.update_height();
                pivot
            }
            None => node,
        }
    }
}

impl<T: Keyed> Default for AvlTree<T> {
    fn default() -> Self {
        Self::new()
    }
}
