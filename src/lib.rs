pub mod error;
pub mod http;
pub mod model;
pub mod storage;

use std::sync::{Mutex, PoisonError};

use tracing::{info, warn};

pub use crate::{
    error::{Result, TodoError},
    model::{Draft, Item, Priority},
    storage::{FileStore, MemoryStore, Store},
};

/// The four operations over one collection.
///
/// Mutations hold `write_lock` (and the store's own lock) for their whole
/// load → mutate → save span, so two creates can never read the same max
/// id. `list` takes no lock: it may miss an in-flight mutation, but the
/// store never hands it a half-written file.
pub struct TodoService<S> {
    store: S,
    write_lock: Mutex<()>,
}

impl<S: Store> TodoService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Items sorted incomplete-first, then high → medium → low, optionally
    /// filtered by `completed`.
    pub fn list(&self, completed: Option<bool>) -> Result<Vec<Item>> {
        let mut items = self.store.load()?;
        if let Some(done) = completed {
            items.retain(|t| t.completed == done);
        }
        sort_for_listing(&mut items);
        Ok(items)
    }

    /// Store `draft` under the next free id and return it.
    pub fn create(&self, draft: Draft) -> Result<Item> {
        self.exclusive(|items| {
            let max_id = items.iter().map(|t| t.id).max().unwrap_or(0);
            let next_id = max_id
                .checked_add(1)
                .ok_or(TodoError::IdsExhausted(max_id))?;
            let item = draft.into_item(next_id);
            items.push(item.clone());
            Ok(item)
        })
        .inspect(|item| info!(id = item.id, "created to-do item"))
        .inspect_err(|e| warn!(code = e.code(), error = %e, "create failed"))
    }

    /// Replace item `id` wholesale. The path id always wins over whatever
    /// the caller had in mind.
    pub fn update(&self, id: u64, draft: Draft) -> Result<Item> {
        self.exclusive(|items| {
            // First match only; ids are unique anyway.
            let slot = items
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(TodoError::NotFound(id))?;
            *slot = draft.into_item(id);
            Ok(slot.clone())
        })
        .inspect(|_| info!(id, "updated to-do item"))
        .inspect_err(|e| log_failure("update", id, e))
    }

    /// Remove every item with this id.
    pub fn delete(&self, id: u64) -> Result<()> {
        self.exclusive(|items| {
            let before = items.len();
            items.retain(|t| t.id != id);
            if items.len() == before {
                return Err(TodoError::NotFound(id));
            }
            Ok(())
        })
        .inspect(|_| info!(id, "deleted to-do item"))
        .inspect_err(|e| log_failure("delete", id, e))
    }

    /// Run one read-modify-write cycle inside the exclusive section. Nothing
    /// is written if `mutate` fails.
    fn exclusive<T>(&self, mutate: impl FnOnce(&mut Vec<Item>) -> Result<T>) -> Result<T> {
        // The guarded value is `()`; a panic elsewhere can't leave it torn.
        let _process = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _store = self.store.lock()?;

        let mut items = self.store.load()?;
        let out = mutate(&mut items)?;
        self.store.save(&items)?;
        Ok(out)
    }
}

/// Stable sort: incomplete before complete, then by priority rank.
pub fn sort_for_listing(items: &mut [Item]) {
    items.sort_by_key(|t| (t.completed, t.priority.rank()));
}

fn log_failure(op: &str, id: u64, err: &TodoError) {
    match err {
        TodoError::NotFound(_) => warn!(id, "{op}: no such to-do item"),
        other => warn!(id, code = other.code(), error = %other, "{op} failed"),
    }
}
