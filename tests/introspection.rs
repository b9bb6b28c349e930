//! Table structure queries through the connection.

mod common;

use common::MockAdapter;
use dbport::adapter::MetaSource;
use dbport::introspect::{ColumnFlag, RawColumnMeta, TableInfoMode};
use dbport::{Backend, Connection, Options, Portability};
use pretty_assertions::assert_eq;

fn meta() -> Vec<RawColumnMeta> {
    vec![
        RawColumnMeta {
            table: "Users".into(),
            name: "ID".into(),
            type_name: "int".into(),
            len: Some(11),
            flags: vec![ColumnFlag::NotNull, ColumnFlag::PrimaryKey, ColumnFlag::AutoIncrement],
        },
        RawColumnMeta {
            table: "Users".into(),
            name: "Email".into(),
            type_name: "varchar".into(),
            len: Some(128),
            flags: vec![ColumnFlag::UniqueKey],
        },
    ]
}

#[test]
fn table_info_reports_columns_and_flags() {
    let mut adapter = MockAdapter::new(Backend::MySql);
    adapter.table_meta = meta();
    let mut conn = Connection::with_adapter(adapter, Options::default()).unwrap();
    let info = conn
        .table_info(&MetaSource::Table("Users".into()), TableInfoMode::Columns)
        .unwrap();
    assert_eq!(info.num_fields, 2);
    assert_eq!(info.columns[0].flags, "not_null primary_key auto_increment");
    assert_eq!(info.columns[1].type_name, "varchar");
    assert!(info.order.is_none());
}

#[test]
fn table_info_honors_lowercase_portability() {
    let mut adapter = MockAdapter::new(Backend::MySql);
    adapter.table_meta = meta();
    let mut options = Options::default();
    options.portability = Portability::LOWERCASE;
    let mut conn = Connection::with_adapter(adapter, options).unwrap();
    let info = conn
        .table_info(&MetaSource::Table("Users".into()), TableInfoMode::Full)
        .unwrap();
    assert_eq!(info.columns[0].table, "users");
    assert_eq!(info.order.as_ref().unwrap()["email"], 1);
    assert_eq!(info.ordertable.as_ref().unwrap()["users"]["id"], 0);
}
