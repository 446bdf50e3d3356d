pub(crate) mod business;

use std::{marker::PhantomData, path::Path};

use anyhow::Result;
use serde::Serialize;
use sled::{Db, Tree};

const BUSINESS_TREE: &str = "businesses";

/// A value that can be rebuilt from one key/value entry of a tree.
pub(crate) trait TryFromKeyValue: Sized {
    fn try_from_key_value(key: &[u8], value: &[u8]) -> Result<Self>;
}

#[derive(Clone)]
pub(crate) struct Database {
    db: Db,
    business_tree: Tree,
}

impl Database {
    pub(crate) fn connect(path: &Path) -> Result<Database> {
        let db = sled::open(path)?;
        let business_tree = db.open_tree(BUSINESS_TREE)?;
        Ok(Database { db, business_tree })
    }

    fn insert<T: Serialize>(key: &str, val: T, tree: &Tree) -> Result<()> {
        tree.insert(key, bincode::serialize(&val)?)?;
        Ok(())
    }

    pub(crate) async fn flush(&self) -> Result<usize> {
        Ok(self.db.flush_async().await?)
    }
}

/// Iterates over a tree, decoding each entry on the way out.
pub(crate) struct Iter<T> {
    inner: sled::Iter,
    phantom: PhantomData<T>,
}

impl<T> Iter<T> {
    pub(crate) fn new(inner: sled::Iter) -> Self {
        Self {
            inner,
            phantom: PhantomData,
        }
    }
}

impl<T: TryFromKeyValue> Iterator for Iter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|entry| {
            let (key, value) = entry?;
            T::try_from_key_value(&key, &value)
        })
    }
}
