use datalist_core::{err, Filter, Record, Result};
use std::{collections::HashMap, sync::Mutex};

/// Records remembered by `get_one`, keyed by class and filter. `None`
/// remembers a miss.
#[derive(Debug, Default)]
pub(super) struct Cache {
    entries: Mutex<HashMap<String, Option<Record>>>,
}

impl Cache {
    pub(super) fn key(class: &str, filter: &Filter) -> String {
        let mut key = class.to_string();
        for (field, value) in filter.entries() {
            key.push_str(&format!("|{field}={value:?}"));
        }
        key
    }

    pub(super) fn get(&self, key: &str) -> Result<Option<Option<Record>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    pub(super) fn insert(&self, key: String, record: Option<Record>) -> Result<()> {
        self.lock()?.insert(key, record);
        Ok(())
    }

    pub(super) fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Option<Record>>>> {
        self.entries
            .lock()
            .map_err(|_| err!("get_one cache lock poisoned"))
    }
}
