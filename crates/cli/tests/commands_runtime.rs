use std::env;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use chinook_cli::commands::{dispatch, CommandResult};
use chinook_cli::{run_from, Command, CustomerFields};
use chinook_core::{ApplicationError, CustomerId, Decimal};
use chinook_db::fixtures::{ensure_catalog_tables, seed_invoices, InvoiceFixture};
use chinook_db::{connect, CustomerStore, InMemoryCustomerRepository};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn no_arguments_prints_usage_and_succeeds() {
    with_env(&[], || {
        let result = run_from(["chinook"]);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("Usage"), "expected usage text, got: {}", result.output);
    });
}

#[test]
fn unknown_command_prints_usage_and_succeeds() {
    with_env(&[], || {
        let result = run_from(["chinook", "frobnicate"]);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("Usage"), "expected usage text, got: {}", result.output);
    });
}

#[test]
fn non_numeric_id_is_rejected_without_failing() {
    with_env(&[], || {
        let result = run_from(["chinook", "getbyid", "abc"]);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("invalid value"), "got: {}", result.output);
    });
}

#[test]
fn getpaged_rejects_zero_limit_before_opening_the_store() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("chinook.db");
    let url = sqlite_url(&path);

    with_env(&[("CHINOOK_DATABASE_URL", url.as_str())], || {
        let result = run_from(["chinook", "getpaged", "0", "0"]);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("invalid value"), "got: {}", result.output);
        assert!(!path.exists(), "a rejected limit must not initialize the database");

        let accepted = run_from(["chinook", "getpaged", "1", "0"]);
        assert_eq!(accepted.exit_code, 0, "got: {}", accepted.output);
        assert!(path.exists());
    });
}

#[test]
fn usage_errors_are_json_when_requested() {
    with_env(&[], || {
        for args in [
            vec!["chinook", "getbyid", "abc", "--json"],
            vec!["chinook", "--json", "frobnicate"],
            vec!["chinook", "getpaged", "0", "0", "--json"],
        ] {
            let result = run_from(args.clone());
            assert_eq!(result.exit_code, 0, "{args:?}");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["status"], "error", "{args:?}");
            assert_eq!(payload["error_class"], "usage", "{args:?}");
            let message = payload["message"].as_str().unwrap_or("");
            assert!(message.starts_with("error:"), "{args:?}: {message}");
        }

        let help = parse_payload(&run_from(["chinook", "--json"]).output);
        assert_eq!(help["status"], "ok");
        assert!(help["message"].as_str().unwrap_or("").contains("Usage"));
    });
}

#[test]
fn init_creates_database_once() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("chinook.db");
    let url = sqlite_url(&path);

    with_env(&[("CHINOOK_DATABASE_URL", url.as_str())], || {
        let first = run_json(&["init"]);
        assert_eq!(first["status"], "ok");
        assert_eq!(first["data"]["database_created"], true);
        assert_eq!(first["data"]["customer_table_created"], true);
        assert!(path.exists(), "database file should exist after init");

        let second = run_json(&["init"]);
        assert_eq!(second["status"], "ok");
        assert_eq!(second["data"]["database_created"], false);
        assert_eq!(second["data"]["customer_table_created"], false);
    });
}

#[test]
fn schema_initialization_failure_exits_with_code_one() {
    let dir = TempDir::new().expect("temp dir");
    let url = sqlite_url(&dir.path().join("missing").join("nested").join("chinook.db"));

    with_env(&[("CHINOOK_DATABASE_URL", url.as_str())], || {
        let result = run_from(["chinook", "list", "--json"]);
        assert_eq!(result.exit_code, 1, "schema init failure must be fatal");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "schema_init");
    });
}

#[test]
fn invalid_config_exits_with_code_one() {
    with_env(&[("CHINOOK_DATABASE_URL", "postgres://localhost/chinook")], || {
        let result = run_from(["chinook", "list", "--json"]);
        assert_eq!(result.exit_code, 1);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_validation");
    });
}

#[test]
fn database_url_flag_overrides_environment() {
    let dir = TempDir::new().expect("temp dir");
    let env_path = dir.path().join("from-env.db");
    let flag_path = dir.path().join("from-flag.db");

    with_env(&[("CHINOOK_DATABASE_URL", sqlite_url(&env_path).as_str())], || {
        let flag_url = sqlite_url(&flag_path);
        let result = run_from(["chinook", "init", "--database-url", flag_url.as_str()]);
        assert_eq!(result.exit_code, 0, "got: {}", result.output);
        assert!(flag_path.exists());
        assert!(!env_path.exists());
    });
}

#[test]
fn add_then_lookup_by_id_name_and_email() {
    with_temp_database(|_| {
        let added = run_json(&[
            "add",
            "--first-name",
            "Ana",
            "--last-name",
            "Diaz",
            "--email",
            "ana@x.com",
            "--country",
            "Spain",
        ]);
        assert_eq!(added["status"], "ok");
        let id = added["data"]["id"].as_i64().expect("numeric id").to_string();

        let by_id = run_json(&["getbyid", &id]);
        assert_eq!(by_id["data"]["first_name"], "Ana");
        assert_eq!(by_id["data"]["country"], "Spain");
        assert_eq!(by_id["data"]["phone"], "");

        let by_name = run_from(["chinook", "search", "ana"]);
        assert_eq!(by_name.exit_code, 0);
        assert!(by_name.output.contains("Ana Diaz <ana@x.com>"), "got: {}", by_name.output);

        let by_email = run_json(&["getbyemail", "ana@x.com"]);
        assert_eq!(by_email["data"]["last_name"], "Diaz");
    });
}

#[test]
fn add_with_invalid_email_reports_validation_error() {
    with_temp_database(|_| {
        let result = run_from([
            "chinook",
            "add",
            "--first-name",
            "Ana",
            "--last-name",
            "Diaz",
            "--email",
            "not-an-email",
            "--json",
        ]);
        assert_eq!(result.exit_code, 0, "validation errors are not fatal");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "validation");

        assert_eq!(run_json(&["list"])["data"], Value::Array(Vec::new()));
    });
}

#[test]
fn update_merges_given_flags_over_stored_record() {
    with_temp_database(|_| {
        let id = add_customer("Ana", "Diaz", "ana@x.com");

        let updated = run_json(&["update", &id, "--country", "Portugal", "--phone", "+351 1"]);
        assert_eq!(updated["status"], "ok");

        let stored = run_json(&["getbyid", &id]);
        assert_eq!(stored["data"]["email"], "ana@x.com");
        assert_eq!(stored["data"]["first_name"], "Ana");
        assert_eq!(stored["data"]["country"], "Portugal");
        assert_eq!(stored["data"]["phone"], "+351 1");
    });
}

#[test]
fn missing_ids_report_not_found_except_for_delete() {
    with_temp_database(|_| {
        let update = run_json(&["update", "999", "--country", "Spain"]);
        assert_eq!(update["status"], "error");
        assert_eq!(update["error_class"], "not_found");

        let lookup = run_json(&["getbyid", "999"]);
        assert_eq!(lookup["error_class"], "not_found");

        let delete = run_json(&["delete", "999"]);
        assert_eq!(delete["status"], "ok");
    });
}

#[test]
fn getpaged_returns_requested_window() {
    with_temp_database(|_| {
        for n in 1..=5 {
            add_customer(&format!("First{n}"), &format!("Last{n}"), &format!("c{n}@x.com"));
        }

        let page = run_json(&["getpaged", "2", "3"]);
        let rows = page["data"].as_array().expect("array of customers");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["first_name"], "First4");
        assert_eq!(rows[1]["first_name"], "First5");

        let past_end = run_json(&["getpaged", "2", "10"]);
        assert_eq!(past_end["data"], Value::Array(Vec::new()));
    });
}

#[test]
fn reports_without_invoice_tables_are_storage_errors() {
    with_temp_database(|_| {
        add_customer("Ana", "Diaz", "ana@x.com");

        let result = run_from(["chinook", "highspenders", "--json"]);
        assert_eq!(result.exit_code, 0, "storage errors are reported, not fatal");
        assert_eq!(parse_payload(&result.output)["error_class"], "storage");
    });
}

#[test]
fn reports_read_seeded_invoices() {
    with_temp_database(|url| {
        let ana = add_customer("Ana", "Diaz", "ana@x.com");
        let bo = add_customer("Bo", "Li", "bo@x.com");
        run_json(&["update", &ana, "--country", "Spain"]);
        run_json(&["update", &bo, "--country", "Spain"]);
        add_customer("Cy", "Ng", "cy@x.com");

        let ana_id = CustomerId(ana.parse().expect("numeric id"));
        let bo_id = CustomerId(bo.parse().expect("numeric id"));
        seed(
            url,
            vec![
                InvoiceFixture::new(ana_id, Decimal::new(396, 2))
                    .with_tracks("Rock", 2)
                    .with_tracks("Pop", 2),
                InvoiceFixture::new(ana_id, Decimal::new(99, 2)).with_tracks("Jazz", 1),
                InvoiceFixture::new(bo_id, Decimal::new(1386, 2)).with_tracks("Metal", 14),
            ],
        );

        let countries = run_json(&["countbycountry"]);
        assert_eq!(countries["data"][0]["country"], "Spain");
        assert_eq!(countries["data"][0]["customer_count"], 2);

        let spenders = run_json(&["highspenders"]);
        let rows = spenders["data"].as_array().expect("array of spenders");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["customer"]["first_name"], "Bo");
        assert_eq!(rows[1]["customer"]["first_name"], "Ana");

        let genres = run_json(&["populargenres", &ana]);
        let mut names: Vec<&str> = genres["data"]
            .as_array()
            .expect("array of genres")
            .iter()
            .filter_map(|row| row["genre_name"].as_str())
            .collect();
        names.sort_unstable();
        assert_eq!(names, vec!["Pop", "Rock"]);

        let text = run_from(["chinook", "highspenders"]);
        assert!(text.output.contains("Bo Li: 13.86"), "got: {}", text.output);
    });
}

#[tokio::test]
async fn dispatch_runs_against_in_memory_store() {
    let store = InMemoryCustomerRepository::default();
    let fields = CustomerFields {
        first_name: Some("Ana".to_string()),
        last_name: Some("Diaz".to_string()),
        email: Some("ana@x.com".to_string()),
        ..CustomerFields::default()
    };

    let added = dispatch(&Command::Add(fields), &store).await.expect("add succeeds");
    assert_eq!(added.message, "added customer 1");
    assert!(store.get_by_id(CustomerId(1)).await.expect("lookup").is_some());

    let missing = dispatch(&Command::GetById { id: 42 }, &store).await;
    assert!(matches!(missing, Err(ApplicationError::NotFound(_))));

    let blank = CustomerFields { first_name: Some("   ".to_string()), ..CustomerFields::default() };
    let rejected = dispatch(&Command::Add(blank), &store).await;
    assert!(matches!(rejected, Err(ApplicationError::Domain(_))));
}

fn add_customer(first_name: &str, last_name: &str, email: &str) -> String {
    let added = run_json(&[
        "add",
        "--first-name",
        first_name,
        "--last-name",
        last_name,
        "--email",
        email,
    ]);
    assert_eq!(added["status"], "ok", "add failed: {added}");
    added["data"]["id"].as_i64().expect("numeric id").to_string()
}

fn run_json(args: &[&str]) -> Value {
    let mut argv = vec!["chinook"];
    argv.extend_from_slice(args);
    argv.push("--json");
    let result: CommandResult = run_from(argv);
    parse_payload(&result.output)
}

fn seed(url: &str, invoices: Vec<InvoiceFixture>) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime should build");
    runtime.block_on(async {
        let pool = connect(url).await.expect("connect to test database");
        ensure_catalog_tables(&pool).await.expect("create catalog tables");
        seed_invoices(&pool, &invoices).await.expect("seed invoices");
        pool.close().await;
    });
}

fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.display())
}

fn with_temp_database(test_fn: impl FnOnce(&str)) {
    let dir = TempDir::new().expect("temp dir");
    let url = sqlite_url(&dir.path().join("chinook.db"));
    with_env(&[("CHINOOK_DATABASE_URL", url.as_str())], || test_fn(&url));
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "CHINOOK_DATABASE_URL",
        "CHINOOK_DATABASE_MAX_CONNECTIONS",
        "CHINOOK_DATABASE_TIMEOUT_SECS",
        "CHINOOK_LOGGING_LEVEL",
        "CHINOOK_LOGGING_FORMAT",
        "CHINOOK_LOG_LEVEL",
        "CHINOOK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
