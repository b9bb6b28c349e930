//! Table and result-set structure descriptions.

use serde::{Deserialize, Serialize};

use crate::portability::{self, Portability};

/// A flag reported by the native engine for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnFlag {
    NotNull,
    PrimaryKey,
    UniqueKey,
    MultipleKey,
    AutoIncrement,
    Default(String),
}

/// Column description as reported by a native adapter, before any
/// portability normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumnMeta {
    pub table: String,
    pub name: String,
    pub type_name: String,
    pub len: Option<u32>,
    pub flags: Vec<ColumnFlag>,
}

/// Portable column description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub table: String,
    pub name: String,
    pub type_name: String,
    pub len: Option<u32>,
    /// Space-separated flag words, e.g. `"not_null primary_key"`.
    pub flags: String,
}

/// What a table-info call should return beyond the column list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableInfoMode {
    /// Just the columns, in result order.
    Columns,
    /// Columns plus a name-to-first-position index.
    Order,
    /// Columns plus a per-table name-to-position index.
    OrderTable,
    /// Both indexes.
    Full,
}

/// Structure description of a table or result set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableInfo {
    pub columns: Vec<ColumnInfo>,
    pub num_fields: usize,
    /// Column name to position of its first occurrence.
    pub order: Option<std::collections::HashMap<String, usize>>,
    /// Table name to (column name to position).
    pub ordertable: Option<std::collections::HashMap<String, std::collections::HashMap<String, usize>>>,
}

fn flag_word(flag: &ColumnFlag) -> String {
    match flag {
        ColumnFlag::NotNull => "not_null".to_string(),
        ColumnFlag::PrimaryKey => "primary_key".to_string(),
        ColumnFlag::UniqueKey => "unique_key".to_string(),
        ColumnFlag::MultipleKey => "multiple_key".to_string(),
        ColumnFlag::AutoIncrement => "auto_increment".to_string(),
        ColumnFlag::Default(v) => format!("default_{}", v.replace(' ', "%20")),
    }
}

/// Assemble a [`TableInfo`] from raw column metadata, applying name
/// normalization and building the requested indexes.
pub fn build_table_info(
    raw: Vec<RawColumnMeta>,
    mode: TableInfoMode,
    flags: Portability,
) -> TableInfo {
    let mut columns: Vec<ColumnInfo> = raw
        .into_iter()
        .map(|col| ColumnInfo {
            table: col.table,
            name: col.name,
            type_name: col.type_name,
            len: col.len,
            flags: col
                .flags
                .iter()
                .map(flag_word)
                .collect::<Vec<_>>()
                .join(" "),
        })
        .collect();

    for col in &mut columns {
        let mut names = [std::mem::take(&mut col.table), std::mem::take(&mut col.name)];
        portability::normalize_names(&mut names, flags);
        let [table, name] = names;
        col.table = table;
        col.name = name;
    }

    let num_fields = columns.len();
    let mut info = TableInfo {
        columns,
        num_fields,
        order: None,
        ordertable: None,
    };

    if matches!(mode, TableInfoMode::Order | TableInfoMode::Full) {
        let mut order = std::collections::HashMap::new();
        for (i, col) in info.columns.iter().enumerate() {
            order.entry(col.name.clone()).or_insert(i);
        }
        info.order = Some(order);
    }
    if matches!(mode, TableInfoMode::OrderTable | TableInfoMode::Full) {
        let mut ordertable: std::collections::HashMap<String, std::collections::HashMap<String, usize>> =
            std::collections::HashMap::new();
        for (i, col) in info.columns.iter().enumerate() {
            ordertable
                .entry(col.table.clone())
                .or_default()
                .insert(col.name.clone(), i);
        }
        info.ordertable = Some(ordertable);
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<RawColumnMeta> {
        vec![
            RawColumnMeta {
                table: "Users".into(),
                name: "ID".into(),
                type_name: "int".into(),
                len: Some(11),
                flags: vec![ColumnFlag::NotNull, ColumnFlag::PrimaryKey],
            },
            RawColumnMeta {
                table: "Users".into(),
                name: "Name".into(),
                type_name: "varchar".into(),
                len: Some(64),
                flags: vec![],
            },
            RawColumnMeta {
                table: "Orders".into(),
                name: "ID".into(),
                type_name: "int".into(),
                len: Some(11),
                flags: vec![ColumnFlag::NotNull],
            },
        ]
    }

    #[test]
    fn flags_join_as_words() {
        let info = build_table_info(sample(), TableInfoMode::Columns, Portability::NONE);
        assert_eq!(info.num_fields, 3);
        assert_eq!(info.columns[0].flags, "not_null primary_key");
        assert_eq!(info.columns[1].flags, "");
        assert!(info.order.is_none());
    }

    #[test]
    fn order_index_keeps_first_occurrence() {
        let info = build_table_info(sample(), TableInfoMode::Order, Portability::NONE);
        let order = info.order.unwrap();
        // "ID" appears in two tables; the first position wins.
        assert_eq!(order["ID"], 0);
        assert_eq!(order["Name"], 1);
    }

    #[test]
    fn ordertable_disambiguates_duplicate_names() {
        let info = build_table_info(sample(), TableInfoMode::Full, Portability::NONE);
        let ordertable = info.ordertable.unwrap();
        assert_eq!(ordertable["Users"]["ID"], 0);
        assert_eq!(ordertable["Orders"]["ID"], 2);
    }

    #[test]
    fn lowercase_applies_to_tables_and_columns() {
        let info = build_table_info(sample(), TableInfoMode::Order, Portability::LOWERCASE);
        assert_eq!(info.columns[0].table, "users");
        assert_eq!(info.columns[0].name, "id");
        assert_eq!(info.order.unwrap()["id"], 0);
    }
}
