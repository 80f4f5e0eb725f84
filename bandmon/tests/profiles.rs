//! Profile load/save and resolution (non-interactive paths only). Each test
//! isolates its config under a temp XDG_CONFIG_HOME.

use std::fs;
use std::path::Path;

use assert_cmd::Command;

use bandmon::profiles::{ProfileEntry, ProfileRequest, ProfilesFile, ResolveProfile};

fn run(args: &[&str], config_home: &Path) -> (bool, String) {
    let output = Command::cargo_bin("bandmon")
        .expect("bandmon binary")
        .args(args)
        .env("XDG_CONFIG_HOME", config_home)
        .output()
        .expect("run bandmon");
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    (output.status.success(), text)
}

fn profiles_path(config_home: &Path) -> std::path::PathBuf {
    config_home.join("bandmon").join("profiles.json")
}

#[test]
fn profile_created_on_first_use() {
    let td = tempfile::tempdir().unwrap();
    let (_ok, _out) = run(
        &["--profile", "unittest", "ws://example:1/ws", "--dry-run"],
        td.path(),
    );
    let data = fs::read_to_string(profiles_path(td.path())).expect("profiles.json created");
    assert!(data.contains("unittest"), "missing profile entry: {data}");
    assert!(data.contains("ws://example:1/ws"), "{data}");
}

#[test]
fn identical_rerun_does_not_rewrite_profile() {
    let td = tempfile::tempdir().unwrap();
    let (_ok, _out) = run(&["--profile", "prod", "ws://one/ws", "--dry-run"], td.path());
    let first = fs::read_to_string(profiles_path(td.path())).unwrap();
    let (_ok2, _out2) = run(&["--profile", "prod", "ws://one/ws", "--dry-run"], td.path());
    let second = fs::read_to_string(profiles_path(td.path())).unwrap();
    assert_eq!(first, second, "profile file changed despite identical input");
}

#[test]
fn save_flag_overwrites_changed_profile() {
    let td = tempfile::tempdir().unwrap();
    let (_ok, _out) = run(&["--profile", "prod", "ws://one/ws", "--dry-run"], td.path());
    let (_ok2, _out2) = run(
        &["--profile", "prod", "--save", "ws://two/ws", "--dry-run"],
        td.path(),
    );
    let data = fs::read_to_string(profiles_path(td.path())).unwrap();
    assert!(data.contains("two"), "updated URL not written: {data}");
}

#[test]
fn subscription_defaults_are_persisted() {
    let td = tempfile::tempdir().unwrap();
    let (_ok, _out) = run(
        &[
            "--profile",
            "lanwatch",
            "--interval",
            "5000",
            "--iface",
            "ether1",
            "ws://router:5001/ws",
            "--dry-run",
        ],
        td.path(),
    );
    let data = fs::read_to_string(profiles_path(td.path())).unwrap();
    assert!(data.contains("lanwatch"));
    assert!(data.contains("5000"));
    assert!(data.contains("ether1"));
}

#[test]
fn named_profile_is_loaded_for_later_runs() {
    let td = tempfile::tempdir().unwrap();
    let (_ok, _out) = run(
        &["--profile", "home", "--interval", "3000", "ws://router:5001/ws", "--dry-run"],
        td.path(),
    );
    // Second run names the profile only; url and interval come from disk.
    let (ok, text) = run(&["--profile", "home", "--dry-run"], td.path());
    assert!(ok, "{text}");
    assert!(text.contains("url=ws://router:5001/ws"), "{text}");
    assert!(text.contains("interval=3000ms"), "{text}");
}

// Resolution logic is public API; exercise the non-interactive branches
// directly as well.

#[test]
fn resolve_prefers_loaded_entry_when_only_name_given() {
    let mut pf = ProfilesFile::default();
    pf.profiles.insert(
        "prod".into(),
        ProfileEntry {
            url: "ws://router:5001/ws".into(),
            interval_ms: Some(4000),
            interfaces: vec!["ether1".into()],
        },
    );
    let req = ProfileRequest {
        profile_name: Some("prod".into()),
        url: None,
        interval_ms: None,
        interfaces: Vec::new(),
    };
    match req.resolve(&pf) {
        ResolveProfile::Loaded(entry) => {
            assert_eq!(entry.url, "ws://router:5001/ws");
            assert_eq!(entry.interval_ms, Some(4000));
        }
        _ => panic!("expected Loaded"),
    }
}

#[test]
fn resolve_unknown_name_prompts_create() {
    let req = ProfileRequest {
        profile_name: Some("nope".into()),
        url: None,
        interval_ms: None,
        interfaces: Vec::new(),
    };
    match req.resolve(&ProfilesFile::default()) {
        ResolveProfile::PromptCreate(name) => assert_eq!(name, "nope"),
        _ => panic!("expected PromptCreate"),
    }
}

#[test]
fn resolve_nothing_given_and_no_profiles_is_none() {
    let req = ProfileRequest {
        profile_name: None,
        url: None,
        interval_ms: None,
        interfaces: Vec::new(),
    };
    assert!(matches!(
        req.resolve(&ProfilesFile::default()),
        ResolveProfile::None
    ));
}
