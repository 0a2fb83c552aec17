use std::collections::HashMap;

use mmrag_core::{Fragment, Identifier};

/// Exact-key store of original fragments.
#[derive(Debug, Default)]
pub struct ContentStore {
    entries: HashMap<Identifier, Fragment>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: Identifier, fragment: Fragment) {
        self.entries.insert(id, fragment);
    }

    pub fn get(&self, id: &Identifier) -> Option<&Fragment> {
        self.entries.get(id)
    }

    pub fn remove(&mut self, id: &Identifier) -> Option<Fragment> {
        self.entries.remove(id)
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A content entry that is removed again on drop unless committed, so a
/// failed or cancelled summary write never leaves half a pair behind.
pub(crate) struct PendingContent<'a> {
    store: &'a mut ContentStore,
    id: Identifier,
    committed: bool,
}

impl<'a> PendingContent<'a> {
    pub(crate) fn stage(store: &'a mut ContentStore, id: Identifier, fragment: Fragment) -> Self {
        store.insert(id, fragment);
        Self { store, id, committed: false }
    }

    pub(crate) fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for PendingContent<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.store.remove(&self.id);
        }
    }
}
