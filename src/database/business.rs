use std::collections::HashSet;

use anyhow::{Context, Result};
use sled::Batch;
use tracing::warn;

use super::{Database, Iter, TryFromKeyValue};
use crate::directory::BusinessRecord;

impl Database {
    pub(crate) fn insert_businesses(&self, businesses: Vec<BusinessRecord>) -> Result<()> {
        for business in businesses {
            let key = business.id.clone();
            Database::insert(&key, business, &self.business_tree)?;
        }
        Ok(())
    }

    /// Replaces the whole directory with `businesses` in one atomic batch.
    ///
    /// Returns the number of businesses that were dropped because they are
    /// no longer listed.
    pub(crate) fn replace_businesses(&self, businesses: Vec<BusinessRecord>) -> Result<usize> {
        let listed: HashSet<&str> = businesses.iter().map(|b| b.id.as_str()).collect();
        let mut batch = Batch::default();
        let mut removed = 0;
        for key in self.business_tree.iter().keys() {
            let key = key?;
            if !std::str::from_utf8(&key).is_ok_and(|id| listed.contains(id)) {
                batch.remove(key);
                removed += 1;
            }
        }
        for business in &businesses {
            batch.insert(business.id.as_bytes(), bincode::serialize(business)?);
        }
        self.business_tree.apply_batch(batch)?;
        Ok(removed)
    }

    pub(crate) fn business(&self, id: &str) -> Result<Option<BusinessRecord>> {
        self.business_tree
            .get(id)?
            .map(|value| BusinessRecord::try_from_key_value(id.as_bytes(), &value))
            .transpose()
    }

    pub(crate) fn businesses(&self) -> Iter<BusinessRecord> {
        Iter::new(self.business_tree.iter())
    }

    /// All stored businesses in id order. Entries that fail to decode are
    /// logged and left out.
    pub(crate) fn load_businesses(&self) -> Vec<BusinessRecord> {
        self.businesses()
            .filter_map(|business| {
                business
                    .map_err(|e| warn!("Skipping unreadable business record: {e:#}"))
                    .ok()
            })
            .collect()
    }
}

impl TryFromKeyValue for BusinessRecord {
    fn try_from_key_value(key: &[u8], value: &[u8]) -> Result<Self> {
        let id = String::from_utf8(key.to_vec())
            .with_context(|| format!("invalid key in database: {key:02x?}"))?;
        let mut business: BusinessRecord = bincode::deserialize(value)
            .with_context(|| format!("invalid value in database for key {id:?}"))?;
        business.id = id;
        Ok(business)
    }
}
