//! End-to-end tests for the `regression` binary, using shell scripts in place
//! of the filter generators, the simulator and the resolver.

#![cfg(unix)]
#![allow(clippy::panic_in_result_fn)]

use anyhow::Result;
use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::os::unix::fs::PermissionsExt;

const ALLOW_BATCH: &str = "\
# filters that allow everything
test type: bpf-sim
01-sim-allow all read N N N N N N ALLOW
01-sim-allow all 1-3 N N N N N N ALLOW
01-sim-allow all write 0-1 N N N N N KILL
01-sim-allow all bogus N N N N N N ALLOW
";

const BASIC_BATCH: &str = "\
test type: basic
./pass
./fail
";

/// Lays out `<root>/tests` and `<root>/tools` the way a source tree does.
struct Tree {
    root: assert_fs::TempDir,
}

impl Tree {
    fn new() -> Result<Self> {
        let root = assert_fs::TempDir::new()?;

        let tree = Self { root };
        tree.script("tests/01-sim-allow", "echo allow-all")?;
        tree.script("tests/pass", "exit 0")?;
        tree.script("tests/fail", "exit 2")?;
        tree.script(
            "tools/scmp_sys_resolver",
            "case \"$1\" in read) echo 0 ;; write) echo 1 ;; *) exit 1 ;; esac",
        )?;
        // Allows everything except write with a non-zero first argument.
        tree.script(
            "tools/scmp_bpf_sim",
            "test \"$6\" = 1 && test \"$8\" = 1 && echo KILL && exit 0; echo ALLOW",
        )?;

        tree.root
            .child("tests/01-sim-allow.tests")
            .write_str(ALLOW_BATCH)?;
        tree.root.child("tests/02-basic.tests").write_str(BASIC_BATCH)?;

        Ok(tree)
    }

    fn script(&self, path: &str, body: &str) -> Result<()> {
        let file = self.root.child(path);
        file.write_str(&format!("#!/bin/sh\n{body}\n"))?;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o755))?;
        Ok(())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("regression"));
        cmd.env_remove("REGRESSION_SIMULATOR")
            .env_remove("REGRESSION_RESOLVER")
            .env_remove("REGRESSION_TESTS_DIR")
            .arg("--tests-dir")
            .arg(self.root.path().join("tests"))
            .arg("--arch")
            .arg("x86_64");
        cmd
    }
}

#[test]
fn full_run_reports_every_outcome() -> Result<()> {
    let tree = Tree::new()?;

    tree.command()
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Test 01-sim-allow%%001-00000 result:   SUCCESS\n",
        ))
        .stdout(predicate::str::contains(
            "Test 01-sim-allow%%002-00003 result:   SUCCESS\n",
        ))
        .stdout(predicate::str::contains(
            "Test 01-sim-allow%%003-00001 result:   FAILURE 01-sim-allow simulator=ALLOW\n",
        ))
        .stdout(predicate::str::contains(
            "Test 01-sim-allow%%003-00002 result:   SUCCESS\n",
        ))
        .stdout(predicate::str::contains(
            "Test 01-sim-allow%%004-00000 result:   ERROR resolver rc=1\n",
        ))
        .stdout(predicate::str::contains(
            "Test 02-basic%%002-00000 result:   FAILURE ./fail rc=2\n",
        ))
        .stdout(predicate::str::ends_with(
            "Regression Test Summary\n \
             tests run: 9\n \
             tests skipped: 0\n \
             tests passed: 6\n \
             tests failed: 2\n \
             tests errored: 1\n",
        ));

    Ok(())
}

#[test]
fn single_record_with_log_file() -> Result<()> {
    let tree = Tree::new()?;
    let log = tree.root.child("run.log");

    tree.command()
        .args(["-b", "02-basic", "-s", "1", "-l"])
        .arg(log.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    log.assert(predicate::str::starts_with(
        "Test 02-basic%%001-00000 result:   SUCCESS\n",
    ));
    log.assert(predicate::str::contains(" tests run: 1\n"));

    Ok(())
}

#[test]
fn verbose_run_shows_data_lines() -> Result<()> {
    let tree = Tree::new()?;

    tree.command()
        .args(["-v", "-b", "01-sim-allow", "-s", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Test 01-sim-allow%%003-00000 data:     01-sim-allow all write 0-1 N N N N N KILL\n",
        ))
        .stdout(predicate::str::contains(
            "Test 01-sim-allow%%003-00001 data:     01-sim-allow all 1 0 N N N N N KILL\n",
        ));

    Ok(())
}

#[test]
fn other_arch_records_are_skipped() -> Result<()> {
    let tree = Tree::new()?;
    tree.root
        .child("tests/03-sim-arch.tests")
        .write_str("test type: bpf-sim\n01-sim-allow x86 read N N N N N N ALLOW\n")?;

    tree.command()
        .args(["-b", "03-sim-arch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("result:").not())
        .stdout(predicate::str::contains(" tests skipped: 1\n"));

    Ok(())
}

#[test]
fn list_does_not_run_anything() -> Result<()> {
    let tree = Tree::new()?;

    tree.command()
        .args(["--list", "-T", "basic"])
        .assert()
        .success()
        .stdout("02-basic%%001-00000: ./pass\n02-basic%%002-00000: ./fail\n");

    Ok(())
}

#[test]
fn missing_tools_become_errors_not_crashes() -> Result<()> {
    let tree = Tree::new()?;

    tree.command()
        .args(["-b", "01-sim-allow", "-s", "1", "--simulator"])
        .arg(tree.root.path().join("tools/absent"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Test 01-sim-allow%%001-00000 result:   ERROR",
        ));

    Ok(())
}

#[test]
fn unwritable_log_fails() -> Result<()> {
    let tree = Tree::new()?;

    tree.command()
        .arg("-l")
        .arg(tree.root.path().join("missing-dir/run.log"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to open log file"));

    Ok(())
}
