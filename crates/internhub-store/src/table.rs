//! Generic entity table
//!
//! A `RwLock<HashMap>` keyed by the entity id. Deleted rows stay in the map
//! with `deleted_at` set and are hidden from every read except
//! [`Table::get_including_deleted`] and [`Table::rows`].

use chrono::{DateTime, Utc};
use internhub_core::{DomainError, DomainResult, Entity};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug)]
pub struct Table<T: Entity> {
    rows: RwLock<HashMap<T::Id, T>>,
}

impl<T: Entity> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Table<T> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuild from stored rows, rejecting duplicate ids
    pub fn from_rows(rows: Vec<T>) -> DomainResult<Self> {
        let mut map = HashMap::with_capacity(rows.len());
        for row in rows {
            let id = row.id();
            if map.insert(id, row).is_some() {
                return Err(DomainError::Storage(format!(
                    "duplicate {} id {id} in stored rows",
                    T::KIND
                )));
            }
        }
        Ok(Self {
            rows: RwLock::new(map),
        })
    }

    pub fn insert(&self, row: T) -> DomainResult<T::Id> {
        let id = row.id();
        let mut rows = self.rows.write();
        if rows.contains_key(&id) {
            return Err(DomainError::conflict(format!("{} {id} already exists", T::KIND)));
        }
        rows.insert(id, row);
        Ok(id)
    }

    /// Live row or `NotFound`
    pub fn get(&self, id: T::Id) -> DomainResult<T> {
        self.find(id).ok_or_else(|| DomainError::not_found(T::KIND, id))
    }

    /// Live row, if any
    pub fn find(&self, id: T::Id) -> Option<T> {
        self.rows.read().get(&id).filter(|r| !r.is_deleted()).cloned()
    }

    pub fn get_including_deleted(&self, id: T::Id) -> Option<T> {
        self.rows.read().get(&id).cloned()
    }

    /// Mutate a live row under the write lock.
    ///
    /// The closure works on a copy; the row is replaced (and `updated_at`
    /// set to `now`) only when it returns `Ok`.
    pub fn update<R>(
        &self,
        id: T::Id,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut T) -> DomainResult<R>,
    ) -> DomainResult<(T, R)> {
        let mut rows = self.rows.write();
        let slot = rows
            .get_mut(&id)
            .filter(|r| !r.is_deleted())
            .ok_or_else(|| DomainError::not_found(T::KIND, id))?;
        let mut draft = slot.clone();
        let out = f(&mut draft)?;
        draft.timestamps_mut().updated_at = now;
        *slot = draft.clone();
        Ok((draft, out))
    }

    /// Mark a live row deleted
    pub fn soft_delete(&self, id: T::Id, now: DateTime<Utc>) -> DomainResult<T> {
        let mut rows = self.rows.write();
        let slot = rows
            .get_mut(&id)
            .filter(|r| !r.is_deleted())
            .ok_or_else(|| DomainError::not_found(T::KIND, id))?;
        let stamps = slot.timestamps_mut();
        stamps.deleted_at = Some(now);
        stamps.updated_at = now;
        Ok(slot.clone())
    }

    /// Live rows matching `pred`, newest first
    pub fn list(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        let mut out: Vec<T> = self
            .rows
            .read()
            .values()
            .filter(|r| !r.is_deleted() && pred(r))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.timestamps().created_at.cmp(&a.timestamps().created_at));
        out
    }

    pub fn count(&self, pred: impl Fn(&T) -> bool) -> usize {
        self.rows
            .read()
            .values()
            .filter(|r| !r.is_deleted() && pred(r))
            .count()
    }

    pub fn any(&self, pred: impl Fn(&T) -> bool) -> bool {
        self.rows
            .read()
            .values()
            .any(|r| !r.is_deleted() && pred(r))
    }

    /// Every row including deleted ones, oldest first
    pub fn rows(&self) -> Vec<T> {
        let mut out: Vec<T> = self.rows.read().values().cloned().collect();
        out.sort_by(|a, b| a.timestamps().created_at.cmp(&b.timestamps().created_at));
        out
    }

    /// Live row count
    #[must_use]
    pub fn len(&self) -> usize {
        self.count(|_| true)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
