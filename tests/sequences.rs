//! Sequence emulation: native sequences, table-backed emulation with
//! on-demand creation, and seed repair.

mod common;

use common::{done, native_error, rows, MockAdapter};
use dbport::{Backend, Connection, ErrorKind, OptionValue, Options};
use pretty_assertions::assert_eq;

fn conn(adapter: MockAdapter) -> Connection<MockAdapter> {
    Connection::with_adapter(adapter, Options::default()).unwrap()
}

#[test]
fn sequence_names_follow_the_format_option() {
    let mut conn = conn(MockAdapter::new(Backend::MySql));
    assert_eq!(conn.sequence_name("users"), "users_seq");
    conn.set_option("seqname_format", OptionValue::Str("seq_%s".into()))
        .unwrap();
    assert_eq!(conn.sequence_name("users"), "seq_users");
    // Unsafe characters are replaced, not passed through.
    assert_eq!(conn.sequence_name("users; --"), "seq_users____");
}

#[test]
fn native_sequences_select_the_next_value() {
    let mut conn = conn(MockAdapter::new(Backend::Postgres)
        .on("SELECT NEXTVAL('users_seq')", rows(&["nextval"], &[&[Some("42")]])));
    assert_eq!(conn.next_id("users", true).unwrap(), 42);
}

#[test]
fn native_sequences_are_created_on_demand() {
    let adapter = MockAdapter::new(Backend::Postgres)
        .on_once(
            "SELECT NEXTVAL('users_seq')",
            native_error(None, "ERROR: relation \"users_seq\" does not exist"),
        )
        .on("CREATE SEQUENCE users_seq", done(0))
        .on("SELECT NEXTVAL('users_seq')", rows(&["nextval"], &[&[Some("1")]]));
    let mut conn = conn(adapter);
    assert_eq!(conn.next_id("users", true).unwrap(), 1);
    assert_eq!(conn.adapter().log[1], "CREATE SEQUENCE users_seq");
}

#[test]
fn missing_sequence_without_ondemand_fails() {
    let adapter = MockAdapter::new(Backend::Postgres).on(
        "SELECT NEXTVAL('users_seq')",
        native_error(None, "ERROR: relation \"users_seq\" does not exist"),
    );
    let mut conn = conn(adapter);
    let err = conn.next_id("users", false).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoSuchTable);
}

#[test]
fn emulated_sequences_use_the_backing_table() {
    let adapter = MockAdapter::new(Backend::MySql)
        .on("UPDATE users_seq SET id = LAST_INSERT_ID(id + 1)", done(1))
        .with_insert_ids(&[7, 8]);
    let mut conn = conn(adapter);
    assert_eq!(conn.next_id("users", true).unwrap(), 7);
    assert_eq!(conn.next_id("users", true).unwrap(), 8);
}

#[test]
fn emulated_sequences_are_created_and_seeded_on_demand() {
    let adapter = MockAdapter::new(Backend::MySql)
        .on_once(
            "UPDATE users_seq",
            native_error(Some(1146), "Table 'db.users_seq' doesn't exist"),
        )
        .on("CREATE TABLE users_seq", done(0))
        .on("INSERT INTO users_seq (id) VALUES (0)", done(1))
        .on("UPDATE users_seq", done(1))
        .with_insert_ids(&[1]);
    let mut conn = conn(adapter);
    assert_eq!(conn.next_id("users", true).unwrap(), 1);
    assert_eq!(
        conn.adapter().log,
        vec![
            "UPDATE users_seq SET id = LAST_INSERT_ID(id + 1)".to_string(),
            "CREATE TABLE users_seq (id INTEGER UNSIGNED AUTO_INCREMENT NOT NULL, PRIMARY KEY(id))"
                .to_string(),
            "INSERT INTO users_seq (id) VALUES (0)".to_string(),
            "UPDATE users_seq SET id = LAST_INSERT_ID(id + 1)".to_string(),
        ]
    );
}

#[test]
fn missing_seed_row_is_repaired_under_lock() {
    let adapter = MockAdapter::new(Backend::MySql)
        .on_once("UPDATE users_seq", done(0))
        .on("UPDATE users_seq", done(1))
        .on("LOCK TABLES users_seq WRITE", done(0))
        .on("INSERT INTO users_seq (id) VALUES (0)", done(1))
        .on("UNLOCK TABLES", done(0))
        .with_insert_ids(&[1]);
    let mut conn = conn(adapter);
    assert_eq!(conn.next_id("users", true).unwrap(), 1);
    assert_eq!(
        conn.adapter().log,
        vec![
            "UPDATE users_seq SET id = LAST_INSERT_ID(id + 1)".to_string(),
            "LOCK TABLES users_seq WRITE".to_string(),
            "INSERT INTO users_seq (id) VALUES (0)".to_string(),
            "UNLOCK TABLES".to_string(),
            "UPDATE users_seq SET id = LAST_INSERT_ID(id + 1)".to_string(),
        ]
    );
}

#[test]
fn zero_id_triggers_a_reseed_instead_of_a_duplicate() {
    let adapter = MockAdapter::new(Backend::MySql)
        .on("UPDATE users_seq", done(1))
        .on("LOCK TABLES users_seq WRITE", done(0))
        .on("INSERT INTO users_seq (id) VALUES (0)", done(1))
        .on("UNLOCK TABLES", done(0))
        .with_insert_ids(&[0, 1]);
    let mut conn = conn(adapter);
    assert_eq!(conn.next_id("users", true).unwrap(), 1);
    assert_eq!(conn.adapter().log[1], "LOCK TABLES users_seq WRITE");
}

#[test]
fn drop_sequence_uses_the_backing_object() {
    let mut conn = conn(MockAdapter::new(Backend::Postgres)
        .on("DROP SEQUENCE users_seq", done(0)));
    conn.drop_sequence("users").unwrap();

    let mut conn = self::conn(MockAdapter::new(Backend::Sqlite)
        .on("DROP TABLE users_seq", done(0)));
    conn.drop_sequence("users").unwrap();
}

#[test]
fn sqlite_emulation_inserts_a_fresh_row() {
    let adapter = MockAdapter::new(Backend::Sqlite)
        .on("INSERT INTO users_seq (id) VALUES (NULL)", done(1))
        .with_insert_ids(&[3]);
    let mut conn = conn(adapter);
    assert_eq!(conn.next_id("users", true).unwrap(), 3);
}
