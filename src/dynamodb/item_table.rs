use std::collections::BTreeSet;

use unicode_width::UnicodeWidthStr;

use super::{format::format_compact, schema::TableSchema, value::Item};

pub const MIN_COLUMN_WIDTH: usize = 15;
pub const MAX_COLUMN_WIDTH: usize = 1000;
pub const COLUMN_PADDING: usize = 2;
/// Only the first rows are measured when sizing a column.
pub const WIDTH_SAMPLE_ROWS: usize = 10;
pub const MISSING_CELL: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub width: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemTable {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
    /// Every column seen in the result, in discovery order. Feeds the column
    /// picker regardless of which columns are currently visible.
    pub all_columns: Vec<String>,
}

impl ItemTable {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

pub fn build_item_table(
    schema: &TableSchema,
    items: &[Item],
    saved_columns: Option<&[String]>,
) -> ItemTable {
    if items.is_empty() {
        return ItemTable::default();
    }
    let all_columns = discover_columns(schema, items);
    let visible = match saved_columns {
        Some(saved) if !saved.is_empty() => saved
            .iter()
            .filter(|name| items.iter().any(|item| item.contains_key(name.as_str())))
            .cloned()
            .collect(),
        _ => all_columns.clone(),
    };
    let columns: Vec<Column> = visible
        .into_iter()
        .map(|name| {
            let width = column_width(&name, items);
            Column { name, width }
        })
        .collect();
    let rows = items
        .iter()
        .map(|item| {
            columns
                .iter()
                .map(|column| {
                    item.get(&column.name)
                        .map(format_compact)
                        .unwrap_or_else(|| MISSING_CELL.to_string())
                })
                .collect()
        })
        .collect();
    ItemTable {
        columns,
        rows,
        all_columns,
    }
}

/// Union of the keys of every item: partition key first, sort key second,
/// everything else in lexicographic order.
pub fn discover_columns(schema: &TableSchema, items: &[Item]) -> Vec<String> {
    let mut rest: BTreeSet<&str> = items
        .iter()
        .flat_map(|item| item.keys().map(String::as_str))
        .collect();
    let mut columns = Vec::with_capacity(rest.len() + 2);
    columns.push(schema.partition_key.clone());
    rest.remove(schema.partition_key.as_str());
    if let Some(sort_key) = schema.sort_key.as_ref() {
        columns.push(sort_key.clone());
        rest.remove(sort_key.as_str());
    }
    columns.extend(rest.into_iter().map(str::to_string));
    columns
}

pub fn column_width(name: &str, items: &[Item]) -> usize {
    let widest_value = items
        .iter()
        .take(WIDTH_SAMPLE_ROWS)
        .filter_map(|item| item.get(name))
        .map(|value| format_compact(value).width())
        .max()
        .unwrap_or(0);
    (name.width().max(widest_value) + COLUMN_PADDING).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
}

#[cfg(test)]
mod tests {
    use crate::dynamodb::value::AttrValue;

    use super::*;

    fn item(pairs: &[(&str, &str)]) -> Item {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), AttrValue::S(v.to_string())))
            .collect()
    }

    #[test]
    fn keys_are_pinned_before_other_columns() {
        let schema = TableSchema::new("pk", Some("sk"));
        let items = vec![item(&[("extra", "x"), ("sk", "1"), ("pk", "a")])];
        let table = build_item_table(&schema, &items, None);
        assert_eq!(table.column_names(), vec!["pk", "sk", "extra"]);
        assert_eq!(table.all_columns, vec!["pk", "sk", "extra"]);
    }

    #[test]
    fn columns_are_the_union_across_items() {
        let schema = TableSchema::new("id", None);
        let items = vec![
            item(&[("id", "1"), ("zeta", "z")]),
            item(&[("id", "2"), ("alpha", "a")]),
        ];
        let table = build_item_table(&schema, &items, None);
        assert_eq!(table.column_names(), vec!["id", "alpha", "zeta"]);
        assert_eq!(table.rows[0], vec!["1", "-", "z"]);
        assert_eq!(table.rows[1], vec!["2", "a", "-"]);
    }

    #[test]
    fn saved_columns_keep_order_and_drop_absent_ones() {
        let schema = TableSchema::new("id", None);
        let items = vec![item(&[("id", "1"), ("name", "n"), ("age", "3")])];
        let saved = vec!["age".to_string(), "gone".to_string(), "id".to_string()];
        let table = build_item_table(&schema, &items, Some(&saved));
        assert_eq!(table.column_names(), vec!["age", "id"]);
        assert_eq!(table.all_columns, vec!["id", "age", "name"]);
    }

    #[test]
    fn empty_saved_columns_mean_no_preference() {
        let schema = TableSchema::new("id", None);
        let items = vec![item(&[("id", "1"), ("name", "n")])];
        let table = build_item_table(&schema, &items, Some(&[]));
        assert_eq!(table.column_names(), vec!["id", "name"]);
    }

    #[test]
    fn width_adds_padding_to_widest_value() {
        let items = vec![item(&[("id", &"v".repeat(20))])];
        assert_eq!(column_width("id", &items), 22);
    }

    #[test]
    fn width_has_a_floor() {
        assert_eq!(column_width("x", &[]), 15);
    }

    #[test]
    fn width_only_samples_first_rows() {
        let mut items: Vec<Item> = (0..10).map(|_| item(&[("id", "short")])).collect();
        items.push(item(&[("id", &"w".repeat(40))]));
        assert_eq!(column_width("id", &items), MIN_COLUMN_WIDTH);
    }

    #[test]
    fn no_items_build_an_empty_table() {
        let schema = TableSchema::new("id", None);
        assert_eq!(build_item_table(&schema, &[], None), ItemTable::default());
    }
}
