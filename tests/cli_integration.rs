//! CLI integration tests for taskdag
//!
//! These tests drive the binary end to end: project setup, task records,
//! dependency rules and the graph queries.

use predicates::prelude::*;
use tempfile::TempDir;

/// A project directory plus an isolated config home
struct TestProject {
    dir: TempDir,
    config_home: TempDir,
}

impl TestProject {
    fn new() -> Self {
        let project = Self {
            dir: TempDir::new().unwrap(),
            config_home: TempDir::new().unwrap(),
        };
        project
            .cmd_as("alice")
            .arg("init")
            .arg(project.dir.path())
            .assert()
            .success();
        project
    }

    fn cmd_as(&self, owner: &str) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("taskdag"));
        cmd.current_dir(self.dir.path())
            .env("XDG_CONFIG_HOME", self.config_home.path())
            .env("TASKDAG_OWNER", owner)
            .env_remove("RUST_LOG");
        cmd
    }

    fn cmd(&self) -> assert_cmd::Command {
        self.cmd_as("alice")
    }

    /// Adds a task and returns its id
    fn add_task(&self, title: &str) -> String {
        let output = self
            .cmd()
            .args(["task", "add", title, "--format", "json"])
            .assert()
            .success();

        let stdout = String::from_utf8_lossy(&output.get_output().stdout);
        let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        json["id"].as_str().unwrap().to_string()
    }

    fn depend(&self, task: &str, depends_on: &str) {
        self.cmd()
            .args(["dep", "add", task, depends_on])
            .assert()
            .success();
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self
            .cmd()
            .args(args)
            .args(["--format", "json"])
            .assert()
            .success();
        let stdout = String::from_utf8_lossy(&output.get_output().stdout);
        serde_json::from_str(&stdout).unwrap()
    }
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_structure() {
    let dir = TempDir::new().unwrap();
    let config_home = TempDir::new().unwrap();

    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("taskdag"))
        .env("XDG_CONFIG_HOME", config_home.path())
        .arg("init")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized taskdag project"));

    assert!(dir.path().join(".taskdag").is_dir());
    assert!(dir.path().join(".taskdag/config.toml").is_file());
    assert!(dir.path().join(".taskdag/.gitignore").is_file());
    assert!(dir.path().join(".taskdag/tasks.db").is_file());
}

#[test]
fn test_init_is_idempotent() {
    let project = TestProject::new();

    project
        .cmd()
        .arg("init")
        .arg(project.dir.path())
        .assert()
        .success();
}

#[test]
fn test_commands_outside_project_fail() {
    let dir = TempDir::new().unwrap();

    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("taskdag"))
        .current_dir(dir.path())
        .arg("ready")
        .assert()
        .failure()
        .stderr(predicate::str::contains("taskdag init"));
}

// =============================================================================
// Task Tests
// =============================================================================

#[test]
fn test_task_add_and_list() {
    let project = TestProject::new();

    project
        .cmd()
        .args(["task", "add", "Call client"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created task"));
    project.add_task("Send proposal");

    project
        .cmd()
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Call client"))
        .stdout(predicate::str::contains("Send proposal"));
}

#[test]
fn test_task_status_changes() {
    let project = TestProject::new();
    let id = project.add_task("Draft contract");

    project
        .cmd()
        .args(["task", "start", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("in_progress"));

    let task = project.json(&["task", "status", &id, "completed"]);
    assert_eq!(task["status"], "completed");
    assert!(task["completed_at"].is_string());
}

#[test]
fn test_task_start_waits_for_prerequisites() {
    let project = TestProject::new();
    let prereq = project.add_task("Prereq");
    let dependent = project.add_task("Dependent");
    project.depend(&dependent, &prereq);

    project
        .cmd()
        .args(["task", "start", &dependent])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot start"))
        .stderr(predicate::str::contains(prereq.as_str()));
    project
        .cmd()
        .args(["task", "status", &dependent, "in_progress"])
        .assert()
        .failure();

    let task = project.json(&["task", "show", &dependent]);
    assert_eq!(task["task"]["status"], "pending");

    project.cmd().args(["task", "done", &prereq]).assert().success();
    project
        .cmd()
        .args(["task", "start", &dependent])
        .assert()
        .success()
        .stdout(predicate::str::contains("in_progress"));
}

#[test]
fn test_task_start_force_skips_prerequisites() {
    let project = TestProject::new();
    let prereq = project.add_task("Prereq");
    let dependent = project.add_task("Dependent");
    project.depend(&dependent, &prereq);

    let task = project.json(&["task", "start", &dependent, "--force"]);
    assert_eq!(task["status"], "in_progress");
}

#[test]
fn test_task_show_lists_dependencies() {
    let project = TestProject::new();
    let a = project.add_task("Research venue");
    let b = project.add_task("Book venue");
    project.depend(&b, &a);

    project
        .cmd()
        .args(["task", "show", &b])
        .assert()
        .success()
        .stdout(predicate::str::contains("Depends on"))
        .stdout(predicate::str::contains(a.as_str()))
        .stdout(predicate::str::contains("Can start: no"));
}

#[test]
fn test_subtasks_hidden_from_ready() {
    let project = TestProject::new();
    let parent = project.add_task("Prepare launch");

    project
        .cmd()
        .args(["task", "add", "Write copy", "--parent", &parent])
        .assert()
        .success();

    let ready = project.json(&["ready"]);
    let titles: Vec<&str> = ready
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Prepare launch"]);
}

#[test]
fn test_task_rm_removes_its_dependencies() {
    let project = TestProject::new();
    let a = project.add_task("Old prerequisite");
    let b = project.add_task("Dependent");
    project.depend(&b, &a);

    project.cmd().args(["task", "rm", &a]).assert().success();

    let start = project.json(&["dep", "can-start", &b]);
    assert_eq!(start["can_start"], true);
}

// =============================================================================
// Dependency Tests
// =============================================================================

#[test]
fn test_dep_add_rejects_self_loop() {
    let project = TestProject::new();
    let a = project.add_task("Loop on myself");

    project
        .cmd()
        .args(["dep", "add", &a, &a])
        .assert()
        .failure()
        .stderr(predicate::str::contains("self-loop"));
}

#[test]
fn test_dep_add_rejects_duplicate() {
    let project = TestProject::new();
    let a = project.add_task("First");
    let b = project.add_task("Second");
    project.depend(&b, &a);

    project
        .cmd()
        .args(["dep", "add", &b, &a])
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate"));
}

#[test]
fn test_dep_add_rejects_cycle_with_path() {
    let project = TestProject::new();
    let a = project.add_task("Qualify lead");
    let b = project.add_task("Demo");
    let c = project.add_task("Close deal");
    project.depend(&b, &a);
    project.depend(&c, &b);

    project
        .cmd()
        .args(["dep", "add", &a, &c])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycle"))
        .stderr(predicate::str::contains(format!("{} -> {}", a, c)));
}

#[test]
fn test_dep_add_json_reports_rule() {
    let project = TestProject::new();
    let a = project.add_task("A");
    let b = project.add_task("B");
    project.depend(&b, &a);

    let output = project
        .cmd()
        .args(["dep", "add", &a, &b, "--format", "json"])
        .assert()
        .failure();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["rule"], "cycle");
    assert_eq!(json["cycle"].as_array().unwrap().len(), 3);
}

#[test]
fn test_dep_check_is_dry_run() {
    let project = TestProject::new();
    let a = project.add_task("A");
    let b = project.add_task("B");

    let check = project.json(&["dep", "check", &b, &a]);
    assert_eq!(check["allowed"], true);

    let start = project.json(&["dep", "can-start", &b]);
    assert_eq!(start["can_start"], true);
}

#[test]
fn test_dep_rm_unblocks() {
    let project = TestProject::new();
    let a = project.add_task("A");
    let b = project.add_task("B");
    project.depend(&b, &a);

    project.cmd().args(["dep", "rm", &b, &a]).assert().success();

    project
        .cmd()
        .args(["dep", "rm", &b, &a])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Dependency not found"));
}

#[test]
fn test_dep_path() {
    let project = TestProject::new();
    let a = project.add_task("A");
    let b = project.add_task("B");
    let c = project.add_task("C");
    project.depend(&b, &a);
    project.depend(&c, &b);

    let path = project.json(&["dep", "path", &a, &c]);
    assert_eq!(path["has_path"], true);
    assert_eq!(path["length"], 2);

    let none = project.json(&["dep", "path", &c, &a]);
    assert_eq!(none["has_path"], false);
    assert_eq!(none["length"], -1);
}

// =============================================================================
// Query Tests
// =============================================================================

#[test]
fn test_ready_and_blocked_follow_completion() {
    let project = TestProject::new();
    let a = project.add_task("Gather requirements");
    let b = project.add_task("Write estimate");
    project.depend(&b, &a);

    project
        .cmd()
        .arg("blocked")
        .assert()
        .success()
        .stdout(predicate::str::contains("Write estimate"));

    project.cmd().args(["task", "done", &a]).assert().success();

    project
        .cmd()
        .arg("ready")
        .assert()
        .success()
        .stdout(predicate::str::contains("Write estimate"));
    project
        .cmd()
        .arg("blocked")
        .assert()
        .success()
        .stdout(predicate::str::contains("No blocked tasks"));
}

#[test]
fn test_graph_levels() {
    let project = TestProject::new();
    let a = project.add_task("A");
    let b = project.add_task("B");
    let c = project.add_task("C");
    project.depend(&b, &a);
    project.depend(&c, &b);

    let graph = project.json(&["graph"]);
    assert_eq!(graph["cyclic"], false);
    assert_eq!(graph["levels"].as_array().unwrap().len(), 3);
    assert_eq!(graph["levels"][0][0], a.as_str());
    assert_eq!(graph["levels"][2][0], c.as_str());

    project
        .cmd()
        .arg("graph")
        .assert()
        .success()
        .stdout(predicate::str::contains("Level 2:"));
}

#[test]
fn test_owners_are_isolated() {
    let project = TestProject::new();
    let a = project.add_task("Alice's task");

    project
        .cmd_as("bob")
        .args(["task", "show", &a])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task not found"));

    project
        .cmd_as("bob")
        .arg("ready")
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks ready"));
}

#[test]
fn test_invalid_task_id_is_rejected() {
    let project = TestProject::new();

    project
        .cmd()
        .args(["task", "show", "not-an-id"])
        .assert()
        .failure();
}
