use std::{fs, path::Path};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn zk(working_dir: &Path, config_home: &Path) -> Command {
  let mut command = Command::cargo_bin("zk").unwrap();
  command
    .current_dir(working_dir)
    .env("XDG_CONFIG_HOME", config_home)
    .env("NO_COLOR", "1")
    .env_remove("ZK_NOTEBOOK_DIR")
    .env_remove("ZK_EDITOR")
    .env_remove("VISUAL")
    .env_remove("EDITOR");
  return command;
}

struct Sandbox {
  notebook: TempDir,
  config_home: TempDir
}

impl Sandbox {
  fn new() -> Sandbox {
    return Sandbox {
      notebook: tempfile::tempdir().unwrap(),
      config_home: tempfile::tempdir().unwrap()
    };
  }

  fn zk(&self) -> Command {
    return zk(self.notebook.path(), self.config_home.path());
  }

  fn initialized() -> Sandbox {
    let sandbox = Sandbox::new();
    sandbox.zk().arg("init").assert().success();
    return sandbox;
  }

  fn write(&self, path: &str, content: &str) {
    let full_path = self.notebook.path().join(path);
    fs::create_dir_all(full_path.parent().unwrap()).unwrap();
    fs::write(full_path, content).unwrap();
  }
}

#[test]
fn init_creates_the_notebook_once() {
  let sandbox = Sandbox::new();

  sandbox.zk()
    .arg("init")
    .assert()
    .success()
    .stdout(predicate::str::contains("Initialized a notebook"));

  assert!(sandbox.notebook.path().join(".zk/config.toml").is_file());

  sandbox.zk()
    .arg("init")
    .assert()
    .failure()
    .stderr(predicate::str::contains("already exists"));
}

#[test]
fn commands_outside_a_notebook_fail() {
  let sandbox = Sandbox::new();

  sandbox.zk()
    .arg("list")
    .assert()
    .failure()
    .stderr(predicate::str::contains("failed to find a notebook"));
}

#[test]
fn index_reports_the_changes() {
  let sandbox = Sandbox::initialized();
  sandbox.write("a.md", "# A");
  sandbox.write("journal/b.md", "# B");

  sandbox.zk()
    .arg("index")
    .assert()
    .success()
    .stdout(predicate::str::contains("Indexed 2 notes").and(predicate::str::contains("+ 2 added")));

  sandbox.zk()
    .args(["index", "--quiet"])
    .assert()
    .success()
    .stdout(predicate::str::is_empty());
}

#[test]
fn list_filters_and_formats_notes() {
  let sandbox = Sandbox::initialized();
  sandbox.write("ideas/rust.md", "# Rust\n\nOwnership #lang");
  sandbox.write("ideas/go.md", "# Go\n\nChannels #lang #concurrency");
  sandbox.write("journal/today.md", "# Today\n\nSee [[rust]]");

  sandbox.zk()
    .args(["list", "--format", "path", "--tag", "lang", "--sort", "title", "--quiet"])
    .assert()
    .success()
    .stdout("ideas/go.md\nideas/rust.md\n");

  sandbox.zk()
    .args(["list", "--format", "{{title}}|{{join tags \", \"}}", "--link-to", "ideas/rust.md", "--quiet"])
    .assert()
    .success()
    .stdout("Today|\n");

  sandbox.zk()
    .args(["list", "--format", "{{slug title}}", "--no-link-to", "ideas/rust.md", "--sort", "path", "--quiet"])
    .assert()
    .success()
    .stdout("go\nrust\n");

  sandbox.zk()
    .args(["list", "--format", "path", "--mention", "ideas/rust.md", "--quiet"])
    .assert()
    .success()
    .stdout("journal/today.md\n");

  sandbox.zk()
    .args(["list", "--format", "json", "--match", "channels"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"path\":\"ideas/go.md\""))
    .stderr(predicate::str::contains("Found 1 note"));
}

#[test]
fn tags_are_listed_with_counts() {
  let sandbox = Sandbox::initialized();
  sandbox.write("a.md", "#lang #rust");
  sandbox.write("b.md", "#lang");

  sandbox.zk()
    .args(["tag", "list", "--sort", "note-count", "--quiet"])
    .assert()
    .success()
    .stdout("lang (2)\nrust (1)\n");
}

#[test]
fn graph_prints_notes_and_links() {
  let sandbox = Sandbox::initialized();
  sandbox.write("a.md", "# A\n\n[[b]]");
  sandbox.write("b.md", "# B");

  sandbox.zk()
    .arg("graph")
    .assert()
    .success()
    .stdout(predicate::str::contains("\"sourcePath\":\"a.md\"").and(predicate::str::contains("\"targetPath\":\"b.md\"")));
}

#[test]
fn new_notes_use_the_default_template() {
  let sandbox = Sandbox::initialized();

  let output = sandbox.zk()
    .args(["new", "ideas", "--title", "Fresh idea", "--print-path"])
    .assert()
    .success()
    .get_output()
    .stdout
    .clone();

  let created_path = String::from_utf8(output).unwrap();
  let content = fs::read_to_string(created_path.trim()).unwrap();
  assert!(content.starts_with("# Fresh idea"));
  assert!(created_path.trim().contains("ideas"));
}

#[test]
fn dry_run_prints_the_content_with_piped_stdin() {
  let sandbox = Sandbox::initialized();

  sandbox.zk()
    .args(["new", "--title", "Piped", "--dry-run"])
    .write_stdin("from stdin")
    .assert()
    .success()
    .stdout("# Piped\n\nfrom stdin\n");
}

#[test]
fn aliases_run_through_the_shell() {
  let sandbox = Sandbox::initialized();
  let config_path = sandbox.notebook.path().join(".zk/config.toml");
  let mut config = fs::read_to_string(&config_path).unwrap();
  // [alias] is the last table of the generated config.
  config.push_str("\nhello = \"echo hello $@\"\n");
  fs::write(&config_path, config).unwrap();

  sandbox.zk()
    .args(["hello", "world"])
    .assert()
    .success()
    .stdout("hello world\n");
}

#[test]
fn docs_gen_writes_a_config_that_checks_clean() {
  let sandbox = Sandbox::new();

  sandbox.zk()
    .args(["docs", "gen", "--yes"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Wrote"));

  sandbox.zk()
    .args(["docs", "check"])
    .assert()
    .success()
    .stdout(predicate::str::contains("valid docs configuration"));
}

#[test]
fn docs_check_fails_without_the_markdown_extension() {
  let sandbox = Sandbox::new();
  sandbox.write("docs/conf.py", "project = \"zk\"\nextensions = []\nexclude_patterns = {\".zk\"}\n");

  sandbox.zk()
    .args(["docs", "check"])
    .assert()
    .failure()
    .stdout(predicate::str::contains("extensions"));
}

#[test]
fn docs_diff_between_revisions() {
  let sandbox = Sandbox::new();

  sandbox.zk()
    .args(["docs", "diff", "0.14.0", "0.14.1"])
    .assert()
    .success()
    .stdout(predicate::str::contains("~ release").and(predicate::str::contains("- html_title")));
}

#[test]
fn docs_show_and_keys() {
  let sandbox = Sandbox::new();

  sandbox.zk()
    .args(["docs", "show", "--revision", "0.14.1", "--format", "json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"release\": \"0.14.1\""));

  sandbox.zk()
    .args(["docs", "keys"])
    .assert()
    .success()
    .stdout(predicate::str::contains("myst_enable_extensions"));
}
