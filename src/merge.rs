//! Keyed merge of baseline records with local overrides.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;

use serde_json::Value;

/// Result of [`merge`].
///
/// `records` holds exactly one record per key. `unkeyed` collects records
/// that carry no key; they are appended as-is and never deduplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged<T> {
    pub records: Vec<T>,
    pub unkeyed: Vec<T>,
}

impl<T> Merged<T> {
    pub fn into_all(self) -> Vec<T> {
        let mut all = self.records;
        all.extend(self.unkeyed);
        all
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.iter().chain(self.unkeyed.iter())
    }

    pub fn len(&self) -> usize {
        self.records.len() + self.unkeyed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Merges `overrides` over `base` by `key_of`; on a key conflict the later record wins.
///
/// Order: first occurrence of each key decides its position (base order,
/// then override-only keys in override order). A replaced record keeps the
/// position of the one it replaced.
pub fn merge<T, K, F>(
    base: impl IntoIterator<Item = T>,
    overrides: impl IntoIterator<Item = T>,
    key_of: F,
) -> Merged<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> Option<K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut records: Vec<T> = Vec::new();
    let mut unkeyed = Vec::new();

    for record in base.into_iter().chain(overrides) {
        let Some(key) = key_of(&record) else {
            unkeyed.push(record);
            continue;
        };
        match index.entry(key) {
            Entry::Occupied(slot) => records[*slot.get()] = record,
            Entry::Vacant(slot) => {
                slot.insert(records.len());
                records.push(record);
            }
        }
    }

    Merged { records, unkeyed }
}

/// Shallow overlay of JSON objects: fields of `overlay` replace those of `base`,
/// fields only in `base` survive. Non-object overlays replace `base` wholesale.
pub fn merge_fields(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(target), Value::Object(fields)) => {
            for (name, value) in fields {
                target.insert(name, value);
            }
        }
        (target, overlay) => *target = overlay,
    }
}
