use std::time::Duration;

use httpmock::prelude::*;

use potcheck::checks::web::GlastopfContentCheck;
use potcheck::checks::Heuristic;
use potcheck::config::AppConfig;
use potcheck::core::error::PotcheckError;
use potcheck::core::outcome::ResultKind;
use potcheck::core::snapshot::{Proto, ScanData, ServiceEntry, TargetSnapshot};
use potcheck::probes::web::HttpClient;
use potcheck::probes::{ScriptedProbe, Wire};

struct DeadWire;

impl Wire for DeadWire {
    fn connect_and_read(
        &self,
        _address: &str,
        _port: u16,
        _proto: Proto,
        _timeout: Duration,
    ) -> Result<Vec<u8>, PotcheckError> {
        Err(PotcheckError::Network("refused".into()))
    }

    fn exchange(
        &self,
        _address: &str,
        _port: u16,
        _payload: &[u8],
        _timeout: Duration,
    ) -> Result<Vec<u8>, PotcheckError> {
        Err(PotcheckError::Network("refused".into()))
    }
}

struct DeadScript;

impl ScriptedProbe for DeadScript {
    fn run_script(
        &self,
        _address: &str,
        _script: &str,
        _port: u16,
    ) -> Result<Vec<(String, String)>, PotcheckError> {
        Err(PotcheckError::Probe("script execution failed".into()))
    }
}

fn config() -> AppConfig {
    AppConfig {
        banner_timeout_secs: 2,
        http_timeout_secs: 2,
        probe_timeout_secs: 2,
        user_agent: "potcheck-test".into(),
        reference_text_url: String::new(),
    }
}

fn snapshot_for(server: &MockServer) -> TargetSnapshot {
    let cfg = config();
    let mut snapshot = TargetSnapshot::new(
        server.host(),
        Box::new(DeadWire),
        Box::new(HttpClient::new(&cfg).unwrap()),
        Box::new(DeadScript),
        cfg.http_timeout(),
    );

    let mut data = ScanData::default();
    data.tcp
        .insert(server.port(), ServiceEntry::new("http", "nginx"));
    snapshot.populate(data);
    snapshot
}

#[test]
fn websites_hit_the_server_once_per_scan_identity() {
    let server = MockServer::start();
    let index = server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).body("index");
    });

    let mut snapshot = snapshot_for(&server);

    assert_eq!(snapshot.websites(), vec!["index".to_string()]);
    assert_eq!(snapshot.websites(), vec!["index".to_string()]);
    index.assert_hits(1);

    // a rescan invalidates the cache even when the facts are unchanged
    let mut data = ScanData::default();
    data.tcp
        .insert(server.port(), ServiceEntry::new("http", "nginx"));
    snapshot.populate(data);

    assert_eq!(snapshot.websites(), vec!["index".to_string()]);
    index.assert_hits(2);
}

#[test]
fn page_generated_from_the_reference_text_is_flagged() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/book.txt");
        then.status(200).body(
            "It was the best of times, it was the worst of times, \
             it was the age of wisdom, it was the age of foolishness.",
        );
    });
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).body(
            "<html><p>It was the best of times, it was the worst of times\
             <a href=\"/fork\">read on</a> it was the age of wisdom, \
             it was the age of foolishness</p></html>",
        );
    });

    let snapshot = snapshot_for(&server);
    let check = GlastopfContentCheck::new(server.url("/book.txt"), Duration::from_secs(2));

    let outcome = check.run(&snapshot).unwrap();
    assert_eq!(outcome.kind, ResultKind::Warning);
}

#[test]
fn unrelated_page_content_passes() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/book.txt");
        then.status(200).body("It was the best of times.");
    });
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200)
            .body("<html><p>internal tooling dashboard, authorized use only</p></html>");
    });

    let snapshot = snapshot_for(&server);
    let check = GlastopfContentCheck::new(server.url("/book.txt"), Duration::from_secs(2));

    let outcome = check.run(&snapshot).unwrap();
    assert_eq!(outcome.kind, ResultKind::Ok);
}

#[test]
fn unreachable_reference_text_downgrades_to_unknown() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).body("<html><p>hello</p></html>");
    });

    let snapshot = snapshot_for(&server);
    // nothing listens on this port
    let check = GlastopfContentCheck::new(
        "http://127.0.0.1:1/book.txt".to_string(),
        Duration::from_secs(1),
    );

    let outcome = check.run(&snapshot).unwrap();
    assert_eq!(outcome.kind, ResultKind::Unknown);
}
