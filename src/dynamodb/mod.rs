pub mod filter;
pub mod format;
pub mod item_table;
pub mod schema;
pub mod store;
pub mod value;

pub use filter::{FilterCondition, Operator, ScanFilter};
pub use item_table::{ItemTable, build_item_table};
pub use schema::{SchemaCache, TableSchema};
pub use store::{BulkDeleteOutcome, DynamoStore, KvStore};
pub use value::{AttrValue, Item, Key};
