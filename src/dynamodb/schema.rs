use std::collections::HashMap;

use aws_sdk_dynamodb::types::{KeySchemaElement, KeyType, TableDescription};

use super::value::{Item, Key};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub partition_key: String,
    pub sort_key: Option<String>,
}

impl TableSchema {
    pub fn new(partition_key: impl Into<String>, sort_key: Option<&str>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.map(str::to_string),
        }
    }

    pub fn from_description(table: &TableDescription) -> Option<Self> {
        let mut hash = None;
        let mut range = None;
        for KeySchemaElement {
            attribute_name,
            key_type,
            ..
        } in table.key_schema()
        {
            match key_type {
                KeyType::Hash => hash = Some(attribute_name.clone()),
                KeyType::Range => range = Some(attribute_name.clone()),
                _ => {}
            }
        }
        hash.map(|partition_key| Self {
            partition_key,
            sort_key: range,
        })
    }

    pub fn is_key(&self, column: &str) -> bool {
        column == self.partition_key || self.sort_key.as_deref() == Some(column)
    }

    /// Extract the primary key of `item`. Fails when a key attribute is
    /// missing from the item.
    pub fn key_for(&self, item: &Item) -> Result<Key, String> {
        let mut key = Key::new();
        let hash_value = item
            .get(&self.partition_key)
            .ok_or_else(|| format!("Item is missing {}", self.partition_key))?;
        key.insert(self.partition_key.clone(), hash_value.clone());
        if let Some(sort_key) = self.sort_key.as_ref() {
            let range_value = item
                .get(sort_key)
                .ok_or_else(|| format!("Item is missing {sort_key}"))?;
            key.insert(sort_key.clone(), range_value.clone());
        }
        Ok(key)
    }
}

/// Key schemas by table name, filled on the first describe of each table.
///
/// Entries are never evicted or refreshed: a table's key schema cannot change
/// after creation, and the cache holds one small entry per table opened in
/// this session.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: HashMap<String, TableSchema>,
}

impl SchemaCache {
    pub fn get(&self, table: &str) -> Option<&TableSchema> {
        self.entries.get(table)
    }

    /// Stores the first schema seen for `table`; later inserts are ignored.
    pub fn insert(&mut self, table: &str, schema: TableSchema) -> &TableSchema {
        self.entries.entry(table.to_string()).or_insert(schema)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::dynamodb::value::AttrValue;

    use super::*;

    #[test]
    fn cache_keeps_first_schema() {
        let mut cache = SchemaCache::default();
        cache.insert("orders", TableSchema::new("pk", Some("sk")));
        cache.insert("orders", TableSchema::new("other", None));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("orders"), Some(&TableSchema::new("pk", Some("sk"))));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn key_for_requires_key_attributes() {
        let schema = TableSchema::new("pk", Some("sk"));
        let mut item = Item::new();
        item.insert("pk".to_string(), AttrValue::S("a".to_string()));
        item.insert("extra".to_string(), AttrValue::Null);
        assert_eq!(schema.key_for(&item), Err("Item is missing sk".to_string()));

        item.insert("sk".to_string(), AttrValue::N("1".to_string()));
        let key = schema.key_for(&item).unwrap();
        assert_eq!(key.len(), 2);
        assert!(!key.contains_key("extra"));
    }
}
