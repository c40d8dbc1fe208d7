use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    Client,
    types::{AttributeValue, DeleteRequest, WriteRequest},
};

use super::{
    filter::ScanFilter,
    schema::TableSchema,
    value::{Item, Key, item_from_sdk, key_to_sdk},
};
use crate::{aws::send_request, error::StoreError};

/// Largest number of requests one batch write accepts.
pub const BATCH_SIZE: usize = 25;
const MAX_UNPROCESSED_RESENDS: u32 = 5;
const UNPROCESSED_BACKOFF: Duration = Duration::from_millis(50);

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn list_tables(&self) -> Result<Vec<String>, StoreError>;

    async fn describe_table(&self, table: &str) -> Result<TableSchema, StoreError>;

    /// Reads every page of the table, applying `filter` server-side.
    async fn scan(&self, table: &str, filter: Option<&ScanFilter>)
    -> Result<Vec<Item>, StoreError>;

    async fn delete_item(&self, table: &str, key: &Key) -> Result<(), StoreError>;

    /// Deletes at most [`BATCH_SIZE`] keys in one batch write.
    async fn batch_delete_items(&self, table: &str, keys: &[Key]) -> Result<(), StoreError>;
}

pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KvStore for DynamoStore {
    async fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        let mut table_names = Vec::new();
        let mut last_evaluated_table_name: Option<String> = None;
        loop {
            let span = tracing::trace_span!(
                "ListTables",
                start_table = ?last_evaluated_table_name.as_deref()
            );
            let output = send_request(span, || {
                self.client
                    .list_tables()
                    .set_exclusive_start_table_name(last_evaluated_table_name.clone())
                    .send()
            })
            .await
            .map_err(StoreError::from_sdk)?;
            table_names.extend(output.table_names().iter().cloned());
            match output.last_evaluated_table_name() {
                Some(name) => last_evaluated_table_name = Some(name.to_string()),
                None => break,
            }
        }
        Ok(table_names)
    }

    async fn describe_table(&self, table: &str) -> Result<TableSchema, StoreError> {
        let span = tracing::trace_span!("DescribeTable", table = %table);
        let output = send_request(span, || {
            self.client.describe_table().table_name(table).send()
        })
        .await
        .map_err(StoreError::from_sdk)?;
        output
            .table()
            .and_then(TableSchema::from_description)
            .ok_or_else(|| StoreError::MissingKeySchema(table.to_string()))
    }

    async fn scan(
        &self,
        table: &str,
        filter: Option<&ScanFilter>,
    ) -> Result<Vec<Item>, StoreError> {
        let (expression, names, values) = match filter {
            Some(filter) => (
                Some(filter.filter_expression().to_string()),
                Some(
                    filter
                        .expression_attribute_names()
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect::<HashMap<_, _>>(),
                ),
                Some(
                    filter
                        .expression_attribute_values()
                        .iter()
                        .map(|(k, v)| (k.clone(), AttributeValue::from(v)))
                        .collect::<HashMap<_, _>>(),
                ),
            ),
            None => (None, None, None),
        };

        let mut items = Vec::new();
        let mut last_evaluated_key: Option<HashMap<String, AttributeValue>> = None;
        loop {
            let span = tracing::trace_span!(
                "Scan",
                table = %table,
                filter = ?expression,
                start_key_present = last_evaluated_key.is_some()
            );
            let output = send_request(span, || {
                self.client
                    .scan()
                    .table_name(table)
                    .set_filter_expression(expression.clone())
                    .set_expression_attribute_names(names.clone())
                    .set_expression_attribute_values(values.clone())
                    .set_exclusive_start_key(last_evaluated_key.clone())
                    .send()
            })
            .await
            .map_err(StoreError::from_sdk)?;
            for raw in output.items() {
                items.push(item_from_sdk(raw.clone())?);
            }
            last_evaluated_key = output.last_evaluated_key().cloned();
            if last_evaluated_key.is_none() {
                break;
            }
        }
        tracing::debug!(table = %table, items = items.len(), "Scan complete");
        Ok(items)
    }

    async fn delete_item(&self, table: &str, key: &Key) -> Result<(), StoreError> {
        let span = tracing::trace_span!("DeleteItem", table = %table, key_len = key.len());
        send_request(span, || {
            self.client
                .delete_item()
                .table_name(table)
                .set_key(Some(key_to_sdk(key)))
                .send()
        })
        .await
        .map(|_| ())
        .map_err(StoreError::from_sdk)
    }

    async fn batch_delete_items(&self, table: &str, keys: &[Key]) -> Result<(), StoreError> {
        let mut write_requests = Vec::with_capacity(keys.len());
        for key in keys {
            let delete_request = DeleteRequest::builder()
                .set_key(Some(key_to_sdk(key)))
                .build()
                .map_err(|err| StoreError::Transport(err.to_string()))?;
            write_requests.push(WriteRequest::builder().delete_request(delete_request).build());
        }

        let mut pending = HashMap::from([(table.to_string(), write_requests)]);
        let mut resends = 0;
        loop {
            let pending_count = pending.get(table).map(Vec::len).unwrap_or(0);
            let span = tracing::trace_span!(
                "BatchWriteItem",
                table = %table,
                items = pending_count,
                resends
            );
            let output = send_request(span, || {
                self.client
                    .batch_write_item()
                    .set_request_items(Some(pending.clone()))
                    .send()
            })
            .await
            .map_err(StoreError::from_sdk)?;
            let unprocessed = output.unprocessed_items().cloned().unwrap_or_default();
            let remaining = unprocessed.get(table).map(Vec::len).unwrap_or(0);
            if remaining == 0 {
                return Ok(());
            }
            if resends >= MAX_UNPROCESSED_RESENDS {
                return Err(StoreError::Unprocessed { remaining });
            }
            resends += 1;
            pending = unprocessed;
            tokio::time::sleep(UNPROCESSED_BACKOFF * resends).await;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkDeleteOutcome {
    pub deleted: usize,
    pub error: Option<StoreError>,
}

/// Deletes `keys` in sequential batches of [`BATCH_SIZE`]. Stops at the first
/// failed batch; a failed batch is not retried. Requests of a batch that were
/// processed before it gave up on the rest still count as deleted.
pub async fn delete_in_batches(store: &dyn KvStore, table: &str, keys: &[Key]) -> BulkDeleteOutcome {
    let mut deleted = 0;
    for batch in keys.chunks(BATCH_SIZE) {
        if let Err(err) = store.batch_delete_items(table, batch).await {
            if let StoreError::Unprocessed { remaining } = &err {
                deleted += batch.len().saturating_sub(*remaining);
            }
            tracing::warn!(table = %table, deleted, error = %err, "Batch delete failed");
            return BulkDeleteOutcome {
                deleted,
                error: Some(err),
            };
        }
        deleted += batch.len();
    }
    tracing::debug!(table = %table, deleted, "Batch delete complete");
    BulkDeleteOutcome {
        deleted,
        error: None,
    }
}

/// Deletes every item in `table`. The table is rescanned without a filter so
/// the whole table is emptied, not only the rows currently shown.
pub async fn empty_table(store: &dyn KvStore, table: &str, schema: &TableSchema) -> BulkDeleteOutcome {
    let items = match store.scan(table, None).await {
        Ok(items) => items,
        Err(err) => {
            return BulkDeleteOutcome {
                deleted: 0,
                error: Some(err),
            };
        }
    };
    let keys: Result<Vec<Key>, StoreError> = items
        .iter()
        .map(|item| schema.key_for(item).map_err(StoreError::MissingKey))
        .collect();
    match keys {
        Ok(keys) => delete_in_batches(store, table, &keys).await,
        Err(err) => BulkDeleteOutcome {
            deleted: 0,
            error: Some(err),
        },
    }
}


#[cfg(test)]
mod tests {
    use super::{fake::FakeStore, *};
    use crate::dynamodb::value::AttrValue;

    fn keys(count: usize) -> Vec<Key> {
        (0..count)
            .map(|idx| Key::from([("pk".to_string(), AttrValue::S(format!("item-{idx}")))]))
            .collect()
    }

    #[tokio::test]
    async fn deletes_in_batches_of_twenty_five() {
        let store = FakeStore::default();
        let outcome = delete_in_batches(&store, "orders", &keys(53)).await;
        assert_eq!(store.batch_sizes(), vec![25, 25, 3]);
        assert_eq!(outcome.deleted, 53);
        assert_eq!(outcome.error, None);
    }

    #[tokio::test]
    async fn stops_at_first_failed_batch() {
        let store = FakeStore {
            fail_batch: Some(2),
            ..FakeStore::default()
        };
        let outcome = delete_in_batches(&store, "orders", &keys(53)).await;
        assert_eq!(store.batch_sizes(), vec![25, 25]);
        assert_eq!(outcome.deleted, 25);
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn partially_processed_batch_counts_what_went_through() {
        let store = FakeStore {
            unprocessed_batch: Some((2, 4)),
            ..FakeStore::default()
        };
        let outcome = delete_in_batches(&store, "orders", &keys(53)).await;
        assert_eq!(store.batch_sizes(), vec![25, 25]);
        assert_eq!(outcome.deleted, 46);
        assert_eq!(outcome.error, Some(StoreError::Unprocessed { remaining: 4 }));
    }

    #[tokio::test]
    async fn empty_table_rescans_without_filter() {
        let schema = TableSchema::new("pk", None);
        let items = keys(30);
        let store = FakeStore::with_items("orders", schema.clone(), items);
        let outcome = empty_table(&store, "orders", &schema).await;
        assert_eq!(outcome.deleted, 30);
        assert_eq!(store.batch_sizes(), vec![25, 5]);
        let scans = store.scans.lock().unwrap();
        assert_eq!(scans.as_slice(), &[("orders".to_string(), None)]);
    }

    #[tokio::test]
    async fn empty_table_reports_items_without_keys() {
        let schema = TableSchema::new("id", None);
        let store = FakeStore::with_items("orders", schema.clone(), keys(2));
        let outcome = empty_table(&store, "orders", &schema).await;
        assert_eq!(outcome.deleted, 0);
        assert_eq!(
            outcome.error,
            Some(StoreError::MissingKey("Item is missing id".to_string()))
        );
        assert!(store.batch_sizes().is_empty());
    }
}
