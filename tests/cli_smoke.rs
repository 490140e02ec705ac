use assert_cmd::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn has_git() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn git(dir: &Path, args: &[&str]) {
    assert!(Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

fn init_git_repo(dir: &Path) {
    git(dir, &["init"]);
    git(dir, &["config", "core.autocrlf", "false"]);
    git(dir, &["config", "core.safecrlf", "false"]);
    git(dir, &["config", "user.email", "you@example.com"]);
    git(dir, &["config", "user.name", "Your Name"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

fn commit_file(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut f = File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.sync_all().unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "-m", &format!("add {name}")]);
}

fn run_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let mut cmd = Command::cargo_bin("churnbar").unwrap();
    cmd.current_dir(dir).arg("--repo").arg(dir).args(args);
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

fn lines(n: usize) -> String {
    (0..n).map(|i| format!("line {i}\n")).collect()
}

#[test]
fn chart_json_outputs_rows() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    commit_file(dir.path(), "src/a.rs", "fn a(){}\n");
    commit_file(dir.path(), "src/b.rs", "fn b(){}\nfn c(){}\n");

    let v = run_json(dir.path(), &["chart", "--json"]);
    let rows = v["chart"]["rows"].as_array().unwrap();
    assert!(!rows.is_empty());
    let total: u64 = rows.iter().map(|r| r["total"].as_u64().unwrap()).sum();
    assert_eq!(total, 3);
    assert_eq!(v["chart"]["summary"]["total_insertions"].as_u64(), Some(3));
    assert_eq!(v["chart"]["scale_width"].as_u64(), Some(50));
}

/// Commits `name` with `message`, optionally pinning author and committer dates.
fn commit_with(dir: &Path, name: &str, content: &str, message: &str, date: Option<&str>) {
    fs::write(dir.join(name), content).unwrap();
    git(dir, &["add", "."]);
    let mut cmd = Command::new("git");
    cmd.args(["commit", "-m", message]).current_dir(dir);
    if let Some(date) = date {
        cmd.env("GIT_AUTHOR_DATE", date).env("GIT_COMMITTER_DATE", date);
    }
    assert!(cmd.status().unwrap().success());
}

fn commit_summaries(v: &serde_json::Value) -> Vec<String> {
    v["chart"]["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| {
            let key = r["key"].as_str().unwrap();
            // "<date> <short id> <summary>"
            key.splitn(3, ' ').nth(2).unwrap_or("").to_string()
        })
        .collect()
}

#[test]
fn commit_period_has_one_row_per_commit() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    commit_with(dir.path(), "a.txt", "a\n", "first", Some("2024-01-01 10:00:00 +0000"));
    commit_with(dir.path(), "a.txt", "a\nb\n", "second", Some("2024-01-02 10:00:00 +0000"));
    commit_with(dir.path(), "a.txt", "c\n", "third", Some("2024-01-03 10:00:00 +0000"));

    let v = run_json(dir.path(), &["chart", "--json", "--period", "commit"]);
    assert_eq!(commit_summaries(&v), vec!["first", "second", "third"]);
    assert!(v["chart"]["rows"][0]["key"].as_str().unwrap().starts_with("2024-01-01 "));
    assert!(v["chart"]["summary"]["active_ratio"].is_null());
}

#[test]
fn same_second_commits_keep_history_order() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    let mut content = String::new();
    for step in 0..6 {
        content.push_str(&format!("line {step}\n"));
        commit_with(
            dir.path(),
            "steps.txt",
            &content,
            &format!("step{step}"),
            Some("2024-01-01 12:00:00 +0000"),
        );
    }

    let v = run_json(dir.path(), &["chart", "--json", "--period", "commit"]);
    let expected: Vec<String> = (0..6).map(|step| format!("step{step}")).collect();
    assert_eq!(commit_summaries(&v), expected);
}

#[test]
fn ignored_extensions_do_not_count() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    commit_file(dir.path(), "main.rs", "fn main(){}\n");
    commit_file(dir.path(), "Cargo.lock", &lines(40));

    let all = run_json(dir.path(), &["chart", "--json"]);
    assert_eq!(all["chart"]["summary"]["total_insertions"].as_u64(), Some(41));

    let filtered = run_json(dir.path(), &["--ignore", "lock", "chart", "--json"]);
    assert_eq!(filtered["chart"]["summary"]["total_insertions"].as_u64(), Some(1));
    assert_eq!(filtered["ignored_extensions"][0].as_str(), Some("lock"));
}

#[test]
fn stats_json_reports_classification() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    commit_file(dir.path(), "a.txt", &lines(5));

    let v = run_json(dir.path(), &["stats", "--json", "--percentile", "80"]);
    assert_eq!(v["percentile"].as_u64(), Some(80));
    assert_eq!(v["days"].as_u64(), Some(1));
    assert_eq!(v["classification"]["percentile_value"].as_u64(), Some(5));
    assert!(v["outlier_days"].as_array().unwrap().is_empty());
}

#[test]
fn invalid_percentile_fails_before_reading_history() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("churnbar").unwrap();
    cmd.arg("--repo")
        .arg(dir.path())
        .args(["chart", "--percentile", "0"]);
    let out = cmd.assert().failure().get_output().stderr.clone();
    assert!(String::from_utf8_lossy(&out).contains("percentile"));
}

#[test]
fn empty_history_prints_no_data() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    git(dir.path(), &["commit", "--allow-empty", "-m", "nothing"]);

    let mut cmd = Command::cargo_bin("churnbar").unwrap();
    cmd.current_dir(dir.path())
        .arg("--repo")
        .arg(dir.path())
        .args(["--no-color", "chart"]);
    let out = cmd.assert().success().get_output().stdout.clone();
    assert!(String::from_utf8_lossy(&out).contains("No data to display"));
}

#[test]
fn include_merges_flag_affects_counts() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    commit_file(dir.path(), "file.txt", "a\n");

    git(dir.path(), &["checkout", "-b", "feat"]);
    commit_file(dir.path(), "feat.txt", "f1\n");
    git(dir.path(), &["checkout", "-"]);
    commit_file(dir.path(), "file.txt", "a\nc\n");
    git(dir.path(), &["merge", "--no-ff", "feat", "-m", "merge feat"]);

    let count = |v: &serde_json::Value| v["chart"]["rows"].as_array().unwrap().len();
    let without = run_json(dir.path(), &["chart", "--json", "--period", "commit"]);
    let with = run_json(dir.path(), &["--include-merges", "chart", "--json", "--period", "commit"]);
    assert_eq!(count(&with), count(&without) + 1);
}
