//! Row windows across the three limit strategies, plus row-count
//! emulation.

mod common;

use common::{rows, MockAdapter};
use dbport::{Backend, Connection, ErrorKind, Options, Portability, QueryOutcome};
use pretty_assertions::assert_eq;

fn conn(adapter: MockAdapter) -> Connection<MockAdapter> {
    Connection::with_adapter(adapter, Options::default()).unwrap()
}

fn five_rows() -> common::Reply {
    rows(
        &["n"],
        &[
            &[Some("0")],
            &[Some("1")],
            &[Some("2")],
            &[Some("3")],
            &[Some("4")],
        ],
    )
}

fn collect_window(
    conn: &mut Connection<MockAdapter>,
    sql: &str,
    from: usize,
    count: usize,
) -> Vec<String> {
    match conn.limit_query(sql, from, count, &[]).unwrap() {
        QueryOutcome::Done(_) => panic!("expected rows"),
        QueryOutcome::Rows(mut cur) => {
            let mut out = Vec::new();
            while let Some(mut values) = cur.fetch_values().unwrap() {
                out.push(values.remove(0).unwrap());
            }
            out
        }
    }
}

#[test]
fn alter_strategy_rewrites_the_query() {
    // The adapter sees the rewritten query and returns the window itself.
    let mut conn = conn(MockAdapter::new(Backend::MySql).on(
        "SELECT n FROM t LIMIT 1, 2",
        rows(&["n"], &[&[Some("1")], &[Some("2")]]),
    ));
    let got = collect_window(&mut conn, "SELECT n FROM t", 1, 2);
    assert_eq!(got, vec!["1".to_string(), "2".to_string()]);
    assert_eq!(conn.adapter().log, vec!["SELECT n FROM t LIMIT 1, 2".to_string()]);
}

#[test]
fn emulate_seek_fetches_absolute_rows() {
    let mut conn = conn(MockAdapter::new(Backend::SqlServer).on("SELECT", five_rows()));
    let got = collect_window(&mut conn, "SELECT n FROM t", 2, 2);
    assert_eq!(got, vec!["2".to_string(), "3".to_string()]);
    // The query itself is untouched.
    assert_eq!(conn.adapter().log, vec!["SELECT n FROM t".to_string()]);
}

#[test]
fn skip_rows_discards_the_leading_rows() {
    let mut conn = conn(MockAdapter::new(Backend::Informix).on("SELECT", five_rows()));
    let got = collect_window(&mut conn, "SELECT n FROM t", 3, 10);
    // Only two rows remain past the skip; the window is not padded.
    assert_eq!(got, vec!["3".to_string(), "4".to_string()]);
}

#[test]
fn window_past_the_end_is_empty() {
    let mut conn = conn(MockAdapter::new(Backend::SqlServer).on("SELECT", five_rows()));
    let got = collect_window(&mut conn, "SELECT n FROM t", 9, 3);
    assert!(got.is_empty());
}

#[test]
fn native_num_rows_is_used_when_available() {
    let mut conn = conn(MockAdapter::new(Backend::MySql).on("SELECT", five_rows()));
    match conn.query("SELECT n FROM t", &[]).unwrap() {
        QueryOutcome::Done(_) => panic!("expected rows"),
        QueryOutcome::Rows(mut cur) => {
            assert_eq!(cur.num_rows().unwrap(), 5);
            // Cached: a second call does not hit the adapter again.
            assert_eq!(cur.num_rows().unwrap(), 5);
        }
    }
}

#[test]
fn emulated_num_rows_requires_the_flag() {
    let adapter = MockAdapter::new(Backend::Informix)
        .without_native_num_rows()
        .on("SELECT", five_rows());
    let mut conn = conn(adapter);
    match conn.query("SELECT n FROM t", &[]).unwrap() {
        QueryOutcome::Done(_) => panic!("expected rows"),
        QueryOutcome::Rows(mut cur) => {
            assert_eq!(cur.num_rows().unwrap_err().kind, ErrorKind::NotCapable);
        }
    }
}

#[test]
fn num_rows_emulated_by_rerun() {
    let adapter = MockAdapter::new(Backend::Informix)
        .without_native_num_rows()
        .on("SELECT", five_rows());
    let mut options = Options::default();
    options.portability = Portability::NUMROWS;
    let mut conn = Connection::with_adapter(adapter, options).unwrap();
    match conn.query("SELECT n FROM t", &[]).unwrap() {
        QueryOutcome::Done(_) => panic!("expected rows"),
        QueryOutcome::Rows(mut cur) => {
            assert_eq!(cur.num_rows().unwrap(), 5);
        }
    }
    // The count came from a second execution of the same query.
    assert_eq!(conn.adapter().log.len(), 2);
}

#[test]
fn num_rows_emulated_by_count_subquery() {
    let adapter = MockAdapter::new(Backend::Oracle)
        .without_native_num_rows()
        .on("SELECT COUNT(*) FROM (", rows(&["COUNT(*)"], &[&[Some("5")]]))
        .on("SELECT", five_rows());
    let mut options = Options::default();
    options.portability = Portability::NUMROWS;
    let mut conn = Connection::with_adapter(adapter, options).unwrap();
    match conn.query("SELECT n FROM t", &[]).unwrap() {
        QueryOutcome::Done(_) => panic!("expected rows"),
        QueryOutcome::Rows(mut cur) => {
            assert_eq!(cur.num_rows().unwrap(), 5);
        }
    }
    assert_eq!(
        conn.adapter().log[1],
        "SELECT COUNT(*) FROM (SELECT n FROM t) dbport_count"
    );
}

#[test]
fn emulated_count_is_clamped_to_the_window() {
    let adapter = MockAdapter::new(Backend::Informix)
        .without_native_num_rows()
        .on("SELECT", five_rows());
    let mut options = Options::default();
    options.portability = Portability::NUMROWS;
    let mut conn = Connection::with_adapter(adapter, options).unwrap();
    match conn.limit_query("SELECT n FROM t", 3, 10, &[]).unwrap() {
        QueryOutcome::Done(_) => panic!("expected rows"),
        QueryOutcome::Rows(mut cur) => {
            assert_eq!(cur.num_rows().unwrap(), 2);
        }
    }
}

#[test]
fn autofree_releases_the_result_at_end_of_data() {
    let adapter = MockAdapter::new(Backend::MySql).on("SELECT", rows(&["n"], &[&[Some("0")]]));
    let mut options = Options::default();
    options.autofree = true;
    let mut conn = Connection::with_adapter(adapter, options).unwrap();
    match conn.query("SELECT n FROM t", &[]).unwrap() {
        QueryOutcome::Done(_) => panic!("expected rows"),
        QueryOutcome::Rows(mut cur) => {
            assert!(cur.fetch_values().unwrap().is_some());
            assert!(cur.fetch_values().unwrap().is_none());
            // Freed: further fetches stay at end-of-data.
            assert!(cur.fetch_values().unwrap().is_none());
            cur.free().unwrap();
        }
    }
}
