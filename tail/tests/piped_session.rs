// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! End to end piped sessions, with a shell script standing in for the viewer child.
//!
//! All of these are `#[serial]`: they install process wide signal handlers, raise
//! signals, and exec freshly written scripts.

use nix::{errno::Errno, sys::signal::kill, unistd::Pid};
use pretty_assertions::assert_eq;
use r3bl_tail::{PipeSource, PipedSession, RelayConfig, SessionEnd, SessionState};
use serial_test::serial;
use std::{fs::File,
          io::Write as _,
          os::unix::fs::PermissionsExt as _,
          path::{Path, PathBuf},
          time::{Duration, Instant}};

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("viewer.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// No terminal, so the child always gets the null device.
fn config_for(dir: &Path, script: &Path) -> RelayConfig {
    RelayConfig::default()
        .with_child_program(script)
        .with_tty_path(dir.join("no-such-tty"))
}

fn wait_for_file(path: &Path) -> String {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.ends_with('\n') {
            return content.trim_end().to_string();
        }
        assert!(Instant::now() < deadline, "{path:?} never showed up");
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
#[serial]
fn test_relays_all_bytes_to_a_slow_child() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path().display();
    let script = write_script(
        dir.path(),
        &format!(
            r#"printf '%s\n' "$1" > {d}/relay_path
printf '%s' "$TL_ALLOW_SIGNALS" > {d}/env
cat > {d}/stdin
sleep 0.5
i=0
while [ "$(wc -c < "$1")" -lt 12 ] && [ $i -lt 100 ]; do sleep 0.05; i=$((i+1)); done
cp "$1" {d}/copy
"#
        ),
    );

    let (reader, writer) = rustix::pipe::pipe().unwrap();
    let producer = std::thread::spawn(move || {
        let mut writer = File::from(writer);
        writer.write_all(b"line1\n").unwrap();
        std::thread::sleep(Duration::from_millis(100));
        writer.write_all(b"line2\n").unwrap();
    });

    let mut term_out = vec![];
    let mut marker_out = vec![];
    let report = PipedSession::new(config_for(dir.path(), &script))
        .run_with_output(PipeSource::Fd(reader), &mut term_out, &mut marker_out)
        .unwrap();
    producer.join().unwrap();

    let SessionEnd::ChildExited(Some(status)) = report.end else {
        panic!("unexpected end: {report:?}");
    };
    assert!(status.success());
    assert_eq!(report.bytes_relayed, 12);
    assert_eq!(report.final_state, SessionState::Terminated);

    // The child saw every byte, in order.
    assert_eq!(
        std::fs::read(dir.path().join("copy")).unwrap(),
        b"line1\nline2\n"
    );
    // Signal flag set, stdin fell back to the (empty) null device.
    assert_eq!(std::fs::read_to_string(dir.path().join("env")).unwrap(), "1");
    assert_eq!(std::fs::read(dir.path().join("stdin")).unwrap(), b"");

    // Relay file is gone, and nothing was written to the terminal.
    let relay_path = wait_for_file(&dir.path().join("relay_path"));
    assert!(relay_path.contains("tl_"), "{relay_path}");
    assert!(!Path::new(&relay_path).exists());
    assert!(term_out.is_empty());
    assert!(marker_out.is_empty());
}

#[test]
#[serial]
fn test_sigterm_restores_terminal_and_reaps_child() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path().display();
    let script = write_script(
        dir.path(),
        &format!(
            r#"printf '%s\n' "$1" > {d}/relay_path
printf '%s\n' $$ > {d}/pid
exec sleep 30
"#
        ),
    );

    // Writer stays open and silent for the whole session.
    let (reader, _writer) = rustix::pipe::pipe().unwrap();

    let pid_file = dir.path().join("pid");
    let relay_path_file = dir.path().join("relay_path");
    let interrupter = std::thread::spawn(move || {
        let pid = wait_for_file(&pid_file);
        let relay_path = wait_for_file(&relay_path_file);
        signal_hook::low_level::raise(signal_hook::consts::SIGTERM).unwrap();
        (pid, relay_path)
    });

    let start = Instant::now();
    let mut term_out = vec![];
    let mut marker_out = vec![];
    let report = PipedSession::new(config_for(dir.path(), &script))
        .run_with_output(PipeSource::Fd(reader), &mut term_out, &mut marker_out)
        .unwrap();
    let (pid, relay_path) = interrupter.join().unwrap();

    // Nowhere near the child's 30s sleep.
    assert!(start.elapsed() < Duration::from_secs(10));

    assert_eq!(report.end, SessionEnd::Signaled(signal_hook::consts::SIGTERM));
    assert_eq!(report.final_state, SessionState::Terminated);

    // Each sequence exactly once, in order.
    assert_eq!(
        String::from_utf8(term_out).unwrap(),
        "\x1b[?9l\x1b[?1000l\x1b[?1006l\x1b[?25h"
    );
    assert_eq!(String::from_utf8(marker_out).unwrap(), "^C\n");

    // Child terminated and reaped (no zombie left behind).
    let pid = Pid::from_raw(pid.parse().unwrap());
    assert_eq!(kill(pid, None), Err(Errno::ESRCH));

    assert!(!Path::new(&relay_path).exists());
}

#[test]
#[serial]
fn test_child_that_exits_immediately_ends_session() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "exit 3\n");

    // Writer held open: the pipe never becomes readable.
    let (reader, _writer) = rustix::pipe::pipe().unwrap();

    let start = Instant::now();
    let report = PipedSession::new(config_for(dir.path(), &script))
        .run_with_output(PipeSource::Fd(reader), vec![], vec![])
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(2), "{:?}", start.elapsed());
    let SessionEnd::ChildExited(Some(status)) = report.end else {
        panic!("unexpected end: {report:?}");
    };
    assert_eq!(status.code(), Some(3));
    assert_eq!(report.bytes_relayed, 0);
}

#[test]
#[serial]
fn test_setup_failure_leaves_no_relay_file() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = format!("tl_setup_failure_{}_", std::process::id());
    let config = RelayConfig::default()
        .with_child_program(dir.path().join("missing-viewer"))
        .with_tty_path(dir.path().join("no-such-tty"))
        .with_relay_prefix(prefix.clone());

    let (reader, _writer) = rustix::pipe::pipe().unwrap();
    let result = PipedSession::new(config).run_with_output(
        PipeSource::Fd(reader),
        vec![],
        vec![],
    );

    let report = result.unwrap_err();
    assert!(report.to_string().contains("missing-viewer"), "{report}");

    let leaked = std::fs::read_dir(std::env::temp_dir())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
        .count();
    assert_eq!(leaked, 0);
}
