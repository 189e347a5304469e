use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::process::Command;
use tempfile::tempdir;
use tokio::runtime::Runtime;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn keyscore() -> Command {
    let mut cmd = Command::cargo_bin("keyscore").unwrap();
    cmd.env_remove("KEYSCORE_API_KEY")
        .env_remove("KEYSCORE_BASE_URL")
        .env_remove("RUST_LOG");
    cmd
}

/// Start a mock service answering `/search` for `leaky` and failing with 401
/// for `locked`. The runtime keeps serving while the binary runs.
fn search_service(rt: &Runtime) -> MockServer {
    rt.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_partial_json(json!({"source": "leaky"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": {
                    "combo_2021": [
                        {"email": "", "password": "hunter2"},
                        {"email": "N/A", "password": "letmein", "city": "Oslo"}
                    ]
                },
                "size": 2,
                "took": 25
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_partial_json(json!({"source": "locked"})))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        server
    })
}

#[test]
fn info_lists_catalog_without_api_key() {
    keyscore()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("Available sources (11):"))
        .stdout(predicate::str::contains("xkeyscore"))
        .stdout(predicate::str::contains("1 credit per source"));
}

#[test]
fn info_respects_source_override() {
    keyscore()
        .args(["info", "--sources", "alpha,beta,alpha"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Available sources (2):"))
        .stdout(predicate::str::contains("2. beta"));
}

#[test]
fn missing_api_key_fails() {
    keyscore()
        .args(["email", "a@b.com"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn email_search_prints_and_saves_report() {
    let rt = Runtime::new().unwrap();
    let server = search_service(&rt);
    let out = tempdir().unwrap();

    keyscore()
        .args(["email", "user@site.com!"])
        .args(["--api-key", "k", "--base-url", server.uri().as_str()])
        .args(["--sources", "leaky,locked", "--concurrency", "1"])
        .args(["--color", "never", "--save", "--output-dir"])
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[1/2] leaky: 2 results"))
        .stdout(predicate::str::contains("[2/2] locked: Error:"))
        .stdout(predicate::str::contains("Found data in 1/2 sources"))
        .stdout(predicate::str::contains("Database: leaky > combo_2021"))
        .stdout(predicate::str::contains("Email: user@site.com!"))
        .stdout(predicate::str::contains("Total records displayed: 2"))
        .stdout(predicate::str::contains("Results saved successfully!"));

    let report = out.path().join("usersite.com-email-output.txt");
    let text = fs::read_to_string(&report).unwrap();
    assert!(text.contains("KEYSCORE BREACH DATABASE SEARCH RESULTS"));
    assert!(text.contains("Total Results: 2"));
    assert!(text.contains("Password: letmein"));
    assert!(text.contains("City: Oslo"));
    assert!(text.contains("Search Type: EMAIL"));
    assert!(!text.contains("locked"));
}

#[test]
fn parallel_search_keeps_catalog_order() {
    let rt = Runtime::new().unwrap();
    let server = search_service(&rt);

    let assert = keyscore()
        .args(["email", "a@b.com", "--quiet"])
        .args(["--api-key", "k", "--base-url", server.uri().as_str()])
        .args(["--sources", "locked,leaky", "--concurrency", "4"])
        .args(["--color", "never"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    let locked = stdout.find("[1/2] locked").unwrap();
    let leaky = stdout.find("[2/2] leaky").unwrap();
    assert!(locked < leaky);
    assert!(!stdout.contains("=== SEARCH RESULTS ==="));
}

#[test]
fn unwritable_output_dir_exits_with_save_failure() {
    let rt = Runtime::new().unwrap();
    let server = search_service(&rt);
    let tmp = tempdir().unwrap();
    let missing = tmp.path().join("does-not-exist");

    keyscore()
        .args(["username", "bob", "--quiet", "--save"])
        .args(["--api-key", "k", "--base-url", server.uri().as_str()])
        .args(["--sources", "leaky", "--color", "never", "--output-dir"])
        .arg(&missing)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Save failed:"));
}

#[test]
fn empty_search_has_nothing_to_save() {
    let rt = Runtime::new().unwrap();
    let server = search_service(&rt);
    let out = tempdir().unwrap();

    keyscore()
        .args(["domain", "example.com", "--save"])
        .args(["--api-key", "k", "--base-url", server.uri().as_str()])
        .args(["--sources", "locked", "--color", "never", "--output-dir"])
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No results found across any sources"))
        .stdout(predicate::str::contains("Nothing to save."));
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn single_source_failure_is_an_error() {
    let rt = Runtime::new().unwrap();
    let server = search_service(&rt);

    keyscore()
        .args(["wildcard", "*.example.com", "--source", "locked"])
        .args(["--api-key", "k", "--base-url", server.uri().as_str()])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn count_reports_breakdown_and_credits() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/count"))
            .and(body_partial_json(json!({"source": "big"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 25000})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/count"))
            .and(body_partial_json(json!({"source": "none"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 0})))
            .mount(&server)
            .await;
        server
    });

    keyscore()
        .args(["count", "example.com", "--type", "url"])
        .args(["--api-key", "k", "--base-url", server.uri().as_str()])
        .args(["--sources", "big,none", "--color", "never"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total records available: 25,000"))
        .stdout(predicate::str::contains("[+] big: 25,000 records"))
        .stdout(predicate::str::contains("[-] none: No records"))
        .stdout(predicate::str::contains("All data: ~3 credits (3 pages)"));
}

#[test]
fn invalid_date_is_rejected() {
    keyscore()
        .args(["search", "x", "--type", "url", "--date-from", "2022-13-40"])
        .args(["--api-key", "k", "--base-url", "http://127.0.0.1:1"])
        .assert()
        .failure()
        .code(2);
}
