//! Ordered string interning with ids handed out by an outside authority.
//!
//! Keys are kept sorted under a type-level comparator for binary search;
//! a second table indexed by id maps back to the key. Ids come from the
//! `create`/`fetch` callbacks (the persistent store), so they may arrive
//! out of order and leave holes that are filled later.

use parking_lot::RwLock;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// An owned key with a cheap borrowed view used for lookups.
pub trait InternKey: Send + Sync + 'static {
    type View<'a>: Copy
    where
        Self: 'a;

    fn view(&self) -> Self::View<'_>;
    fn from_view(view: Self::View<'_>) -> Self;
}

impl InternKey for String {
    type View<'a>
        = &'a str
    where
        Self: 'a;

    fn view(&self) -> &str {
        self.as_str()
    }

    fn from_view(view: &str) -> Self {
        view.to_owned()
    }
}

/// Total order over the views of `K`.
pub trait KeyOrder<K: InternKey>: Send + Sync + 'static {
    fn compare(a: K::View<'_>, b: K::View<'_>) -> Ordering;
}

/// Slot `id` was never filled (or `id` is negative / out of range).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownId(pub i32);

struct Entry<K> {
    key: Arc<K>,
    id: i32,
}

struct Tables<K> {
    // sorted by key under the interner's order
    entries: Vec<Entry<K>>,
    keys_by_id: Vec<Option<Arc<K>>>,
}

impl<K> Default for Tables<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            keys_by_id: Vec::new(),
        }
    }
}

impl<K: InternKey> Tables<K> {
    fn search<O: KeyOrder<K>>(&self, view: K::View<'_>) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|entry| O::compare(entry.key.view(), view))
    }

    fn key(&self, id: i32) -> Option<&Arc<K>> {
        let index = usize::try_from(id).ok()?;
        self.keys_by_id.get(index)?.as_ref()
    }

    fn set_key(&mut self, id: i32, key: Arc<K>) {
        debug_assert!(id >= 0, "negative id {id}");
        let index = id as usize;
        if index >= self.keys_by_id.len() {
            self.keys_by_id.resize(index + 1, None);
        }
        self.keys_by_id[index] = Some(key);
    }

    fn insert_at(&mut self, position: usize, key: K, id: i32) {
        let key = Arc::new(key);
        self.set_key(id, Arc::clone(&key));
        self.entries.insert(position, Entry { key, id });
    }
}

pub struct OrderedInterner<K: InternKey, O: KeyOrder<K>> {
    tables: RwLock<Tables<K>>,
    _order: PhantomData<fn() -> O>,
}

impl<K: InternKey, O: KeyOrder<K>> Default for OrderedInterner<K, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: InternKey, O: KeyOrder<K>> OrderedInterner<K, O> {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            _order: PhantomData,
        }
    }

    /// Id of `view`, or `None` if it has not been interned here.
    pub fn find(&self, view: K::View<'_>) -> Option<i32> {
        let tables = self.tables.read();
        tables
            .search::<O>(view)
            .ok()
            .map(|index| tables.entries[index].id)
    }

    /// Returns the id of `view`, calling `create` on a miss.
    ///
    /// `create` runs with no lock held. If another thread inserted the same
    /// key meanwhile, its id wins and the one from `create` is dropped.
    pub fn id_with<E>(
        &self,
        view: K::View<'_>,
        create: impl FnOnce() -> Result<i32, E>,
    ) -> Result<i32, E> {
        if let Some(id) = self.find(view) {
            return Ok(id);
        }

        let id = create()?;

        let mut tables = self.tables.write();
        match tables.search::<O>(view) {
            Ok(index) => Ok(tables.entries[index].id),
            Err(position) => {
                tables.insert_at(position, K::from_view(view), id);
                Ok(id)
            }
        }
    }

    pub fn string(&self, id: i32) -> Result<Arc<K>, UnknownId> {
        self.tables.read().key(id).cloned().ok_or(UnknownId(id))
    }

    /// Like [`string`](Self::string), but back-fills an empty slot from
    /// `fetch`. `fetch` runs with no lock held and never sees a negative id.
    pub fn string_or_fetch<E: From<UnknownId>>(
        &self,
        id: i32,
        fetch: impl FnOnce(i32) -> Result<K, E>,
    ) -> Result<Arc<K>, E> {
        if id < 0 {
            return Err(UnknownId(id).into());
        }
        if let Some(key) = self.tables.read().key(id) {
            return Ok(Arc::clone(key));
        }

        let key = fetch(id)?;

        let mut tables = self.tables.write();
        if let Some(existing) = tables.key(id) {
            return Ok(Arc::clone(existing));
        }
        let key = Arc::new(key);
        match tables.search::<O>(key.view()) {
            Ok(index) => {
                // Same key already present under another id: keep the sorted
                // table as is and only fill the slot.
                tracing::warn!(id, other = tables.entries[index].id, "key interned under two ids");
            }
            Err(position) => tables.entries.insert(
                position,
                Entry {
                    key: Arc::clone(&key),
                    id,
                },
            ),
        }
        tables.set_key(id, Arc::clone(&key));
        Ok(key)
    }

    /// Bulk insert of `(key, id)` pairs. Keys already present keep their id.
    ///
    /// Ends in the same state as inserting the pairs one at a time.
    pub fn insert_entries(&self, entries: impl IntoIterator<Item = (K, i32)>) -> usize {
        let mut tables = self.tables.write();
        let mut added = 0usize;

        for (key, id) in entries {
            if id < 0 {
                continue;
            }
            match tables.search::<O>(key.view()) {
                Ok(_) => {}
                Err(position) => {
                    tables.insert_at(position, key, id);
                    added += 1;
                }
            }
        }

        added
    }

    pub fn len(&self) -> usize {
        self.tables.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        *self.tables.write() = Tables::default();
    }
}

impl<K: InternKey, O: KeyOrder<K>> fmt::Debug for OrderedInterner<K, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("OrderedInterner")
            .field("len", &tables.entries.len())
            .field("id_slots", &tables.keys_by_id.len())
            .finish()
    }
}
