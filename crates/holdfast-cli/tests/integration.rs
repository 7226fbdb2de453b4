use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SESSION: &str = "aaaa1111-2222-3333-4444-555566667777";
const OTHER_SESSION: &str = "bbbb9999-8888-7777-6666-555544443333";

/// A project dir and a hub dir, wired together through env vars.
struct Harness {
    project: TempDir,
    hub: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self {
            project: TempDir::new().unwrap(),
            hub: TempDir::new().unwrap(),
        }
    }

    fn holdfast(&self) -> Command {
        let mut cmd = Command::cargo_bin("holdfast").unwrap();
        cmd.current_dir(self.project.path())
            .env("HOLDFAST_ROOT", self.project.path())
            .env("HOLDFAST_HUB_DIR", self.hub.path())
            // Nothing listens on port 1: reporter probes fail fast.
            .env("HOLDFAST_MISSION_CONTROL_URL", "http://127.0.0.1:1");
        cmd
    }

    fn write_state(&self, name: &str, content: &str) -> std::path::PathBuf {
        let dir = self.project.path().join(".holdfast");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn stop_event(&self) -> String {
        format!(
            r#"{{"session_id": "{SESSION}", "hook_event_name": "Stop", "cwd": "{}"}}"#,
            self.project.path().display()
        )
    }

    fn pre_tool_event(&self, session: &str) -> String {
        format!(
            r#"{{"session_id": "{session}", "hook_event_name": "PreToolUse", "tool_name": "Bash", "cwd": "{}"}}"#,
            self.project.path().display()
        )
    }

    fn queue_dir(&self) -> std::path::PathBuf {
        self.hub.path().join("inbox").join(SESSION)
    }

    fn pending_count(&self) -> usize {
        match std::fs::read_dir(self.queue_dir()) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|x| x == "json"))
                .count(),
            Err(_) => 0,
        }
    }
}

fn relentless_state(iteration: u32, max: u32) -> String {
    format!(
        "---\nskill: build\niteration: {iteration}\nmax_iterations: {max}\n\
         completion_promise: cargo build exits 0\n---\nFix the build errors.\n"
    )
}

// ---------------------------------------------------------------------------
// holdfast init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_layout() {
    let h = Harness::new();
    h.holdfast().arg("init").assert().success();

    assert!(h.project.path().join(".holdfast").is_dir());
    assert!(h.project.path().join(".holdfast/config.yaml").exists());

    let gitignore = std::fs::read_to_string(h.project.path().join(".gitignore")).unwrap();
    assert!(gitignore.contains(".holdfast/*.local.md"));
    assert!(gitignore.contains(".holdfast/*.local.json"));
}

#[test]
fn init_is_idempotent() {
    let h = Harness::new();
    h.holdfast().arg("init").assert().success();
    h.holdfast().arg("init").assert().success();

    let gitignore = std::fs::read_to_string(h.project.path().join(".gitignore")).unwrap();
    assert_eq!(
        gitignore
            .lines()
            .filter(|l| *l == ".holdfast/*.local.md")
            .count(),
        1
    );
}

// ---------------------------------------------------------------------------
// holdfast hook stop
// ---------------------------------------------------------------------------

#[test]
fn stop_hook_without_state_allows() {
    let h = Harness::new();
    h.holdfast()
        .args(["hook", "stop"])
        .write_stdin(h.stop_event())
        .assert()
        .success()
        .stdout("{}\n");
}

#[test]
fn stop_hook_tolerates_garbage_stdin() {
    let h = Harness::new();
    h.holdfast()
        .args(["hook", "stop"])
        .write_stdin("definitely not json")
        .assert()
        .success()
        .stdout("{}\n");
}

#[test]
fn stop_hook_blocks_and_increments() {
    let h = Harness::new();
    let path = h.write_state("relentless-build.local.md", &relentless_state(3, 5));

    h.holdfast()
        .args(["hook", "stop"])
        .write_stdin(h.stop_event())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""decision":"block""#))
        .stdout(predicate::str::contains("Iteration 4/5"));

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("iteration: 4"));
    assert!(content.contains("Fix the build errors."));
}

#[test]
fn stop_hook_exhausts_and_cleans_up() {
    let h = Harness::new();
    let path = h.write_state("relentless-build.local.md", &relentless_state(5, 5));

    h.holdfast()
        .args(["hook", "stop"])
        .write_stdin(h.stop_event())
        .assert()
        .success()
        .stdout(predicate::str::contains("systemMessage"))
        .stdout(predicate::str::contains("max iterations (5)"))
        .stdout(predicate::str::contains("block").not());

    assert!(!path.exists());
}

#[test]
fn stop_hook_disabled_record_is_kept() {
    let h = Harness::new();
    let path = h.write_state(
        "relentless-build.local.md",
        "---\nskill: build\niteration: 2\nenabled: false\n---\ntask\n",
    );

    h.holdfast()
        .args(["hook", "stop"])
        .write_stdin(h.stop_event())
        .assert()
        .success()
        .stdout(predicate::str::contains("disabled"));

    assert!(path.exists());
}

#[test]
fn stop_hook_ignores_other_sessions_state() {
    let h = Harness::new();
    // Scoped to a different session: this session must stop normally.
    h.write_state(
        "relentless-build.bbbb9999.local.md",
        &relentless_state(1, 5),
    );

    h.holdfast()
        .args(["hook", "stop"])
        .write_stdin(h.stop_event())
        .assert()
        .success()
        .stdout("{}\n");
}

#[test]
fn stop_hook_standby_message() {
    let h = Harness::new();
    h.write_state(
        "standby-state.aaaa1111.local.md",
        "---\niteration: 1\nmax_iterations: 200\nidle_count: 2\n---\n",
    );

    h.holdfast()
        .args(["hook", "stop"])
        .write_stdin(h.stop_event())
        .assert()
        .success()
        .stdout(predicate::str::contains("Standby Mode"))
        .stdout(predicate::str::contains(format!(
            "holdfast poll --session {SESSION}"
        )));
}

// ---------------------------------------------------------------------------
// send / hook inject
// ---------------------------------------------------------------------------

#[test]
fn send_then_inject_delivers_instruction() {
    let h = Harness::new();
    h.holdfast()
        .args(["send", "--session", SESSION, "run the tests"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Queued"));

    h.holdfast()
        .args(["hook", "inject"])
        .write_stdin(h.pre_tool_event(SESSION))
        .assert()
        .success()
        .stdout(predicate::str::contains("additionalContext"))
        .stdout(predicate::str::contains("run the tests"))
        .stdout(predicate::str::contains("holdfast done"));
}

#[test]
fn inject_delivers_at_most_one_at_a_time() {
    let h = Harness::new();
    for prompt in ["first", "second"] {
        h.holdfast()
            .args(["send", "--session", SESSION, prompt])
            .assert()
            .success();
    }

    // First inject claims the oldest item.
    h.holdfast()
        .args(["hook", "inject"])
        .write_stdin(h.pre_tool_event(SESSION))
        .assert()
        .success()
        .stdout(predicate::str::contains("first"));

    // With that item still inflight, nothing more is delivered.
    h.holdfast()
        .args(["hook", "inject"])
        .write_stdin(h.pre_tool_event(SESSION))
        .assert()
        .success()
        .stdout("{}\n");
}

#[test]
fn inject_ignores_other_sessions_queue() {
    let h = Harness::new();
    h.holdfast()
        .args(["send", "--session", SESSION, "for someone else"])
        .assert()
        .success();

    h.holdfast()
        .args(["hook", "inject"])
        .write_stdin(h.pre_tool_event(OTHER_SESSION))
        .assert()
        .success()
        .stdout("{}\n");
    assert_eq!(h.pending_count(), 1);
}

#[test]
fn inject_bypassed_while_standby_active() {
    let h = Harness::new();
    h.write_state(
        "standby-state.aaaa1111.local.md",
        "---\niteration: 1\nmax_iterations: 200\n---\n",
    );
    h.holdfast()
        .args(["send", "--session", SESSION, "standby will fetch this"])
        .assert()
        .success();

    h.holdfast()
        .args(["hook", "inject"])
        .write_stdin(h.pre_tool_event(SESSION))
        .assert()
        .success()
        .stdout("{}\n");
    // The item stays pending for the standby actor's own poll.
    assert_eq!(h.pending_count(), 1);
}

#[test]
fn inject_consumes_legacy_inbox_file() {
    let h = Harness::new();
    let inbox_dir = h.hub.path().join("inbox");
    std::fs::create_dir_all(&inbox_dir).unwrap();
    let legacy = inbox_dir.join(format!("{SESSION}.json"));
    std::fs::write(
        &legacy,
        r#"{"prompt": "legacy hello", "source": "Dashboard", "timestamp": 1738970000000}"#,
    )
    .unwrap();

    h.holdfast()
        .args(["hook", "inject"])
        .write_stdin(h.pre_tool_event(SESSION))
        .assert()
        .success()
        .stdout(predicate::str::contains("legacy hello"))
        .stdout(predicate::str::contains("Dashboard"))
        .stdout(predicate::str::contains("holdfast done").not());

    assert!(!legacy.exists());
}

// ---------------------------------------------------------------------------
// poll / done
// ---------------------------------------------------------------------------

#[test]
fn poll_done_lifecycle_is_fifo() {
    let h = Harness::new();
    for prompt in ["first", "second"] {
        h.holdfast()
            .args(["send", "--session", SESSION, prompt])
            .assert()
            .success();
    }

    let out = h
        .holdfast()
        .args(["--json", "poll", "--session", SESSION])
        .output()
        .unwrap();
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["status"], "claimed");
    assert_eq!(v["prompt"], "first");

    // Second poll while the first is inflight: nothing handed out.
    let out = h
        .holdfast()
        .args(["--json", "poll", "--session", SESSION])
        .output()
        .unwrap();
    let busy: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(busy["status"], "inflight");

    let claim_path = v["claim_path"].as_str().unwrap().to_string();
    h.holdfast()
        .args(["done", &claim_path])
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed"));

    let out = h
        .holdfast()
        .args(["--json", "poll", "--session", SESSION])
        .output()
        .unwrap();
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["prompt"], "second");
}

#[test]
fn poll_empty_queue_reports_idle() {
    let h = Harness::new();
    h.holdfast()
        .args(["poll", "--session", SESSION])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing pending."));
}

#[test]
fn done_rejects_unclaimed_path() {
    let h = Harness::new();
    h.holdfast()
        .args(["done", "/nonexistent/item.inflight"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

// ---------------------------------------------------------------------------
// hook report
// ---------------------------------------------------------------------------

#[test]
fn report_without_server_is_silent() {
    let h = Harness::new();
    h.holdfast()
        .args(["hook", "report"])
        .write_stdin(h.stop_event())
        .assert()
        .success()
        .stdout("{}\n");
}

// ---------------------------------------------------------------------------
// holdfast status
// ---------------------------------------------------------------------------

#[test]
fn status_reports_governing_mode_and_queue() {
    let h = Harness::new();
    h.write_state("relentless-build.local.md", &relentless_state(2, 5));
    h.holdfast()
        .args(["send", "--session", SESSION, "queued work"])
        .assert()
        .success();

    let out = h
        .holdfast()
        .args(["--json", "status", "--session", SESSION])
        .output()
        .unwrap();
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["governing"]["family"], "relentless");
    assert_eq!(v["governing"]["iteration"], 2);
    assert_eq!(v["queue"]["pending"], 1);
    assert_eq!(v["state_files"][0]["file"], "relentless-build.local.md");
}

#[test]
fn status_with_no_modes() {
    let h = Harness::new();
    h.holdfast()
        .args(["status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No active modes."));
}
