//! Integration tests for the filewarm CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Command isolated from the user's config files and environment
fn filewarm(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("filewarm").unwrap();
    cmd.current_dir(temp_dir.path())
        .env("HOME", temp_dir.path())
        .env_remove("RUST_LOG")
        .env_remove("FILEWARM_JOBS")
        .env_remove("FILEWARM_BLOCK_SIZE")
        .env_remove("FILEWARM_SKIP_ERRORS");
    cmd
}

/// Write `count` data files and return their absolute paths
fn data_files(dir: &Path, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = dir.join(format!("data-{i}.bin"));
            fs::write(&path, vec![b'a'; 1024 * (i + 1)]).unwrap();
            path
        })
        .collect()
}

fn write_list(dir: &Path, paths: &[PathBuf]) -> PathBuf {
    let list = dir.join("files.txt");
    let body: String = paths.iter().map(|p| format!("{}\n", p.display())).collect();
    fs::write(&list, body).unwrap();
    list
}

#[test]
fn test_cli_help() {
    let temp_dir = TempDir::new().unwrap();
    filewarm(&temp_dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("FILE_LIST"))
        .stdout(predicate::str::contains("--skip-errors"));
}

#[test]
fn test_cli_version() {
    let temp_dir = TempDir::new().unwrap();
    filewarm(&temp_dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("filewarm"));
}

#[test]
fn test_all_files_read() {
    let temp_dir = TempDir::new().unwrap();
    let files = data_files(temp_dir.path(), 5);
    let list = write_list(temp_dir.path(), &files);

    filewarm(&temp_dir)
        .args(["--jobs", "2", "--skip-errors"])
        .arg(&list)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Files processed: 5 / 5"))
        .stdout(predicate::str::contains("Failed files: 0"))
        .stdout(predicate::str::contains("with block size 1M"));
}

#[test]
fn test_missing_file_stops_run() {
    let temp_dir = TempDir::new().unwrap();
    let mut files = data_files(temp_dir.path(), 3);
    files[1] = temp_dir.path().join("not-there.bin");
    let list = write_list(temp_dir.path(), &files);

    filewarm(&temp_dir)
        .arg(&list)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("[1/3] ERROR: File not found:"))
        .stdout(predicate::str::contains("Files processed: 1 / 3"))
        .stdout(predicate::str::contains("Failed files: 1"))
        .stdout(predicate::str::contains("data-2.bin").not());
}

#[test]
fn test_missing_file_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let mut files = data_files(temp_dir.path(), 3);
    files[1] = temp_dir.path().join("not-there.bin");
    let list = write_list(temp_dir.path(), &files);

    filewarm(&temp_dir)
        .arg("-s")
        .arg(&list)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Files processed: 2 / 3"))
        .stdout(predicate::str::contains("Failed files: 1"));
}

#[test]
fn test_empty_list() {
    let temp_dir = TempDir::new().unwrap();
    let list = temp_dir.path().join("files.txt");
    fs::write(&list, "\n# nothing to read yet\n   \n").unwrap();

    filewarm(&temp_dir)
        .arg(&list)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Files processed: 0 / 0"))
        .stdout(predicate::str::contains("Failed files: 0"));
}

#[test]
fn test_comments_do_not_count_toward_total() {
    let temp_dir = TempDir::new().unwrap();
    let files = data_files(temp_dir.path(), 2);
    let list = temp_dir.path().join("files.txt");
    fs::write(
        &list,
        format!("# generated list\n{}\n\n  # skipped\n{}\n", files[0].display(), files[1].display()),
    )
    .unwrap();

    filewarm(&temp_dir)
        .args(["-b", "64K"])
        .arg(&list)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "[1/2] reading {} with block size 64K",
            files[0].display()
        )))
        .stdout(predicate::str::contains("Files processed: 2 / 2"));
}

#[test]
fn test_list_from_stdin() {
    let temp_dir = TempDir::new().unwrap();
    let files = data_files(temp_dir.path(), 2);
    let body: String = files.iter().map(|p| format!("{}\n", p.display())).collect();

    filewarm(&temp_dir)
        .arg("-")
        .write_stdin(body)
        .assert()
        .success()
        .stdout(predicate::str::contains("Files processed: 2 / 2"));
}

#[test]
fn test_quiet_hides_reading_lines() {
    let temp_dir = TempDir::new().unwrap();
    let files = data_files(temp_dir.path(), 2);
    let list = write_list(temp_dir.path(), &files);

    filewarm(&temp_dir)
        .arg("--quiet")
        .arg(&list)
        .assert()
        .success()
        .stdout(predicate::str::contains("reading").not())
        .stdout(predicate::str::contains("Files processed: 2 / 2"));
}

#[test]
fn test_json_summary() {
    let temp_dir = TempDir::new().unwrap();
    let files = data_files(temp_dir.path(), 3);
    let list = write_list(temp_dir.path(), &files);

    let output = filewarm(&temp_dir)
        .args(["--format", "json", "-j", "3"])
        .arg(&list)
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["processed"], 3);
    assert_eq!(summary["failed"], 0);
    assert_eq!(summary["total"], 3);
    assert_eq!(summary["bytes_read"], 1024 + 2048 + 3072);
    assert_eq!(summary["status"], "completed");
}

#[test]
fn test_missing_file_list() {
    let temp_dir = TempDir::new().unwrap();
    filewarm(&temp_dir)
        .arg(temp_dir.path().join("nope.txt"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load file list"));
}

#[test]
fn test_invalid_option_values() {
    let temp_dir = TempDir::new().unwrap();
    let list = write_list(temp_dir.path(), &data_files(temp_dir.path(), 1));

    filewarm(&temp_dir)
        .args(["--jobs", "0"])
        .arg(&list)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid job count"));

    filewarm(&temp_dir)
        .args(["--block-size", "huge"])
        .arg(&list)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid block size"));

    filewarm(&temp_dir)
        .args(["--jobs", "many"])
        .arg(&list)
        .assert()
        .code(1);

    filewarm(&temp_dir).assert().code(1);
}

#[test]
fn test_config_file_and_env() {
    let temp_dir = TempDir::new().unwrap();
    let mut files = data_files(temp_dir.path(), 2);
    files.push(temp_dir.path().join("absent.bin"));
    let list = write_list(temp_dir.path(), &files);

    // Repository config turns on skip_errors
    fs::write(temp_dir.path().join("filewarm.toml"), "skip_errors = true\n").unwrap();
    filewarm(&temp_dir)
        .arg(&list)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Failed files: 1"));

    // The environment overrides the file
    filewarm(&temp_dir)
        .env("FILEWARM_SKIP_ERRORS", "false")
        .arg(&list)
        .assert()
        .code(1);

    // An explicit --config that does not exist is an error
    filewarm(&temp_dir)
        .args(["--config", "missing.toml"])
        .arg(&list)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[cfg(unix)]
#[test]
fn test_interrupt_exits_with_dedicated_code() {
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    let temp_dir = TempDir::new().unwrap();
    // Endless sources keep both workers busy until cancelled
    let list = write_list(temp_dir.path(), &[PathBuf::from("/dev/zero"), PathBuf::from("/dev/zero")]);

    let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin("filewarm"))
        .current_dir(temp_dir.path())
        .env("HOME", temp_dir.path())
        .args(["--jobs", "2", "--block-size", "64K"])
        .arg(&list)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    std::thread::sleep(Duration::from_millis(1000));
    let status = std::process::Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(15);
    let exit = loop {
        if let Some(exit) = child.try_wait().unwrap() {
            break exit;
        }
        assert!(Instant::now() < deadline, "filewarm did not exit after SIGINT");
        std::thread::sleep(Duration::from_millis(50));
    };

    assert_eq!(exit.code(), Some(130));
    let mut stderr = String::new();
    std::io::Read::read_to_string(&mut child.stderr.take().unwrap(), &mut stderr).unwrap();
    assert!(stderr.contains("Interrupted"), "stderr: {stderr}");
}

#[cfg(unix)]
#[test]
fn test_non_utf8_file_name_in_list() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let temp_dir = TempDir::new().unwrap();
    let odd = temp_dir.path().join(OsStr::from_bytes(b"caf\xe9.bin"));
    fs::write(&odd, vec![b'z'; 2048]).unwrap();
    let plain = data_files(temp_dir.path(), 1);

    let mut body = Vec::new();
    body.extend_from_slice(odd.as_os_str().as_bytes());
    body.push(b'\n');
    body.extend_from_slice(plain[0].as_os_str().as_bytes());
    body.push(b'\n');
    let list = temp_dir.path().join("files.txt");
    fs::write(&list, body).unwrap();

    for reader in ["native", "dd"] {
        filewarm(&temp_dir)
            .args(["--reader", reader])
            .arg(&list)
            .assert()
            .code(0)
            .stdout(predicate::str::contains("Files processed: 2 / 2"))
            .stdout(predicate::str::contains("Failed files: 0"));
    }
}
