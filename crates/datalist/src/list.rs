mod data_list;
pub use data_list::DataList;

mod eager_list;
pub use eager_list::{EagerData, EagerLoadedList, JoinMeta, ListShape};

pub(crate) mod eager_load;

use crate::DataObject;
use datalist_core::{Filter, IntoSort, LimitLength, Record, Result, Value};
use indexmap::IndexMap;

/// Operations shared by database-backed and materialized lists.
///
/// Derivations never modify the receiver: each returns a new list.
pub trait List: Sized {
    /// The class the list was created for.
    fn data_class(&self) -> &str;

    /// Keeps rows matching every entry.
    fn filter(&self, filter: impl Into<Filter>) -> Result<Self>;

    /// Keeps rows matching at least one entry.
    fn filter_any(&self, filter: impl Into<Filter>) -> Result<Self>;

    /// Removes rows matching every entry.
    fn exclude(&self, filter: impl Into<Filter>) -> Result<Self>;

    /// Removes rows matching any entry.
    fn exclude_any(&self, filter: impl Into<Filter>) -> Result<Self>;

    /// Replaces the ordering. `None` resets it.
    fn sort(&self, sort: impl IntoSort) -> Result<Self>;

    /// Replaces the limit and offset.
    fn limit(&self, length: impl Into<LimitLength>, offset: i64) -> Result<Self>;

    fn reverse(&self) -> Self;

    fn by_ids(&self, ids: &[i64]) -> Result<Self>;

    fn to_vec(&self) -> Result<Vec<DataObject>>;

    /// The raw rows `to_vec` would revive.
    fn records(&self) -> Result<Vec<Record>>;

    fn count(&self) -> Result<usize>;

    fn first(&self) -> Result<Option<DataObject>>;

    fn last(&self) -> Result<Option<DataObject>>;

    /// Every value of `field`, in list order.
    fn column(&self, field: &str) -> Result<Vec<Value>>;

    fn can_sort_by(&self, field: &str) -> bool;

    fn can_filter_by(&self, field: &str) -> bool;

    fn exists(&self) -> Result<bool> {
        Ok(self.count()? > 0)
    }

    fn by_id(&self, id: i64) -> Result<Option<DataObject>> {
        self.by_ids(&[id])?.first()
    }

    /// The item at `index`.
    fn get(&self, index: usize) -> Result<Option<DataObject>> {
        Ok(self.to_vec()?.into_iter().nth(index))
    }

    /// Maps the text of `key` to `value` for every row. Later rows win.
    fn map(&self, key: &str, value: &str) -> Result<IndexMap<String, Value>> {
        let mut ret = IndexMap::new();
        for record in self.records()? {
            let Some(key) = record.get(key).and_then(Value::to_text) else {
                continue;
            };
            ret.insert(key, record.get(value).cloned().unwrap_or_default());
        }
        Ok(ret)
    }

    fn each(&self, mut f: impl FnMut(&DataObject)) -> Result<()> {
        for object in self.to_vec()? {
            f(&object);
        }
        Ok(())
    }

    /// Keeps the first item per distinct value of `field`. Without a field,
    /// every item is kept.
    fn remove_duplicates(&self, field: Option<&str>) -> Result<Vec<DataObject>> {
        let items = self.to_vec()?;
        let Some(field) = field else {
            return Ok(items);
        };

        let mut seen: Vec<Value> = vec![];
        Ok(items
            .into_iter()
            .filter(|item| {
                let value = item.get(field);
                if seen.contains(value) {
                    false
                } else {
                    seen.push(value.clone());
                    true
                }
            })
            .collect())
    }
}

/// A list that is either database-backed or materialized, as returned when
/// following a to-many relation.
#[derive(Debug, Clone)]
pub enum AnyList {
    Lazy(DataList),
    Eager(EagerLoadedList),
}

impl AnyList {
    pub fn is_eager(&self) -> bool {
        matches!(self, AnyList::Eager(_))
    }
}

macro_rules! delegate {
    ($self:ident, $list:ident => $e:expr) => {
        match $self {
            AnyList::Lazy($list) => $e,
            AnyList::Eager($list) => $e,
        }
    };
    (wrap $self:ident, $list:ident => $e:expr) => {
        match $self {
            AnyList::Lazy($list) => $e.map(AnyList::Lazy),
            AnyList::Eager($list) => $e.map(AnyList::Eager),
        }
    };
}

impl List for AnyList {
    fn data_class(&self) -> &str {
        delegate!(self, list => list.data_class())
    }

    fn filter(&self, filter: impl Into<Filter>) -> Result<Self> {
        let filter = filter.into();
        delegate!(wrap self, list => list.filter(filter))
    }

    fn filter_any(&self, filter: impl Into<Filter>) -> Result<Self> {
        let filter = filter.into();
        delegate!(wrap self, list => list.filter_any(filter))
    }

    fn exclude(&self, filter: impl Into<Filter>) -> Result<Self> {
        let filter = filter.into();
        delegate!(wrap self, list => list.exclude(filter))
    }

    fn exclude_any(&self, filter: impl Into<Filter>) -> Result<Self> {
        let filter = filter.into();
        delegate!(wrap self, list => list.exclude_any(filter))
    }

    fn sort(&self, sort: impl IntoSort) -> Result<Self> {
        let sort = sort.into_sort()?;
        delegate!(wrap self, list => list.sort(sort.clone()))
    }

    fn limit(&self, length: impl Into<LimitLength>, offset: i64) -> Result<Self> {
        let length = length.into();
        delegate!(wrap self, list => list.limit(length, offset))
    }

    fn reverse(&self) -> Self {
        match self {
            AnyList::Lazy(list) => AnyList::Lazy(list.reverse()),
            AnyList::Eager(list) => AnyList::Eager(list.reverse()),
        }
    }

    fn by_ids(&self, ids: &[i64]) -> Result<Self> {
        delegate!(wrap self, list => list.by_ids(ids))
    }

    fn to_vec(&self) -> Result<Vec<DataObject>> {
        delegate!(self, list => list.to_vec())
    }

    fn records(&self) -> Result<Vec<Record>> {
        delegate!(self, list => list.records())
    }

    fn count(&self) -> Result<usize> {
        delegate!(self, list => list.count())
    }

    fn first(&self) -> Result<Option<DataObject>> {
        delegate!(self, list => list.first())
    }

    fn last(&self) -> Result<Option<DataObject>> {
        delegate!(self, list => list.last())
    }

    fn column(&self, field: &str) -> Result<Vec<Value>> {
        delegate!(self, list => list.column(field))
    }

    fn can_sort_by(&self, field: &str) -> bool {
        delegate!(self, list => list.can_sort_by(field))
    }

    fn can_filter_by(&self, field: &str) -> bool {
        delegate!(self, list => list.can_filter_by(field))
    }

    fn exists(&self) -> Result<bool> {
        delegate!(self, list => list.exists())
    }
}
