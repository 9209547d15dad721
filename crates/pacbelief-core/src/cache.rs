//! LRU cache of transition models keyed by observer position and behavior mode.

use crate::grid::{Cell, GridMap};
use crate::transition::{BehaviorMode, TransitionModel};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionKey {
    observer: Cell,
    mode: BehaviorMode,
}

impl TransitionKey {
    pub fn new(observer: Cell, mode: BehaviorMode) -> Self {
        Self { observer, mode }
    }

    pub fn observer(&self) -> Cell {
        self.observer
    }

    pub fn mode(&self) -> BehaviorMode {
        self.mode
    }
}

/// Models are only valid for the grid they were built on; a cache must not be
/// shared between grids.
#[derive(Debug)]
pub struct TransitionCache {
    entries: HashMap<TransitionKey, Arc<TransitionModel>>,
    order: VecDeque<TransitionKey>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl TransitionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
            hits: 0,
            misses: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn get(&self, key: &TransitionKey) -> Option<&Arc<TransitionModel>> {
        self.entries.get(key)
    }

    /// Returns the cached model for `(observer, mode)`, building and storing it on a miss.
    pub fn get_or_build(
        &mut self,
        grid: &GridMap,
        observer: Cell,
        mode: BehaviorMode,
    ) -> Arc<TransitionModel> {
        let key = TransitionKey::new(observer, mode);
        if let Some(model) = self.entries.get(&key).cloned() {
            self.hits += 1;
            self.touch(key);
            return model;
        }

        self.misses += 1;
        let model = Arc::new(TransitionModel::build(grid, observer, mode));
        if self.capacity == 0 {
            return model;
        }
        self.entries.insert(key, Arc::clone(&model));
        self.order.push_back(key);
        self.evict_if_needed();
        model
    }

    fn touch(&mut self, key: TransitionKey) {
        if let Some(position) = self.order.iter().position(|existing| *existing == key) {
            self.order.remove(position);
        }
        self.order.push_back(key);
    }

    fn evict_if_needed(&mut self) {
        while self.capacity > 0 && self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }
}
