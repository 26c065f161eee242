// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words ESRCH ECHILD CLOEXEC EBADF

//! Lifecycle of the viewer child: spawn, poll, terminate, wait.

use crate::{ALLOW_SIGNALS_ENV_VALUE, ALLOW_SIGNALS_ENV_VAR, RelayError, TerminalHandle};
use nix::{errno::Errno,
          sys::signal::{Signal, kill},
          unistd::Pid};
use rustix::io::FdFlags;
use std::{io,
          os::{fd::{BorrowedFd, RawFd},
               unix::process::CommandExt as _},
          path::Path,
          process::{Child, Command, ExitStatus}};

/// Lists this process's open descriptors (`/proc/self/fd` on Linux).
const OPEN_FDS_DIR: &str = "/dev/fd";

/// The operations the poll loop and the [`SignalBridge`] need from a child process.
///
/// [`ChildSupervisor`] is the real implementation. Tests drive the poll loop with fakes
/// that exit on cue.
///
/// [`SignalBridge`]: crate::SignalBridge
pub trait SupervisedChild {
    /// Non-blocking liveness check. Returns `true` once the child has exited.
    fn poll(&mut self) -> bool;

    /// Requests graceful termination. Does nothing if the child already exited.
    fn terminate(&mut self);

    /// Blocks until the child exits and returns its status. Calling this again returns
    /// the same status without blocking. Returns `None` if the status could not be
    /// collected.
    fn wait(&mut self) -> Option<ExitStatus>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildLiveness {
    Running,
    /// Reaped. `None` when the status was lost (eg: `ECHILD`).
    Exited(Option<ExitStatus>),
}

/// Owns the viewer child process.
///
/// The child is launched as `program <relay path>` with:
/// - the reacquired terminal as its stdin,
/// - the inherited environment plus [`ALLOW_SIGNALS_ENV_VAR`],
/// - every other descriptor closed. std opens its own descriptors `O_CLOEXEC`, but ones
///   inherited from our parent (eg: `3>file` in the shell, or a plain `pipe(2)`) are
///   marked close-on-exec in the child right before `exec`.
///
/// If this is dropped while the child is still running, the child is terminated and
/// reaped so it is never orphaned.
#[derive(Debug)]
pub struct ChildSupervisor {
    child: Child,
    liveness: ChildLiveness,
}

impl ChildSupervisor {
    /// # Errors
    ///
    /// Returns [`RelayError::ChildSpawn`] if the terminal can't be duplicated or the
    /// program can't be started.
    pub fn spawn(
        program: &Path,
        relay_path: &Path,
        terminal: &TerminalHandle,
    ) -> miette::Result<Self> {
        let to_spawn_error = |source| RelayError::ChildSpawn {
            program: program.to_path_buf(),
            source,
        };

        let stdin = terminal.try_clone_stdio().map_err(to_spawn_error)?;

        let open_fds = list_descriptors_above_stdio();

        let mut command = Command::new(program);
        command
            .arg(relay_path)
            .stdin(stdin)
            .env(ALLOW_SIGNALS_ENV_VAR, ALLOW_SIGNALS_ENV_VALUE);
        // SAFETY: The hook runs in the child between fork() and exec(). It only reads
        // the captured list and calls fcntl(2), which is async-signal-safe.
        unsafe {
            command.pre_exec(move || mark_close_on_exec(&open_fds));
        }
        let child = command.spawn().map_err(to_spawn_error)?;

        tracing::debug!(
            message = "ChildSupervisor::spawn",
            ?program,
            ?relay_path,
            pid = child.id(),
            tty_fallback = terminal.is_fallback()
        );

        Ok(Self {
            child,
            liveness: ChildLiveness::Running,
        })
    }

    #[must_use]
    pub fn id(&self) -> u32 { self.child.id() }

    #[must_use]
    pub fn liveness(&self) -> ChildLiveness { self.liveness }

    fn mark_exited(&mut self, maybe_status: Option<ExitStatus>) -> Option<ExitStatus> {
        tracing::debug!(
            message = "ChildSupervisor -> exited",
            pid = self.child.id(),
            status = ?maybe_status
        );
        self.liveness = ChildLiveness::Exited(maybe_status);
        maybe_status
    }
}

/// Snapshot of open descriptors `> 2`, taken in the parent so the child doesn't
/// allocate after fork(). Descriptors std opens after this are `O_CLOEXEC` already.
fn list_descriptors_above_stdio() -> Vec<RawFd> {
    match std::fs::read_dir(OPEN_FDS_DIR) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().to_str()?.parse::<RawFd>().ok())
            .filter(|raw_fd| *raw_fd > 2)
            .collect(),
        Err(error) => {
            tracing::warn!(
                message = "ChildSupervisor -> can't list open descriptors",
                dir = OPEN_FDS_DIR,
                ?error
            );
            vec![]
        }
    }
}

/// Runs in the child. Marks every listed descriptor close-on-exec. Marking rather than
/// closing leaves std's own exec error pipe (already close-on-exec) working.
fn mark_close_on_exec(raw_fds: &[RawFd]) -> io::Result<()> {
    for &raw_fd in raw_fds {
        // SAFETY: Borrowed for a single fcntl(2). If the descriptor was closed since the
        // snapshot (eg: the `read_dir` handle) the call fails with EBADF.
        let fd = unsafe { BorrowedFd::borrow_raw(raw_fd) };
        match rustix::io::fcntl_setfd(fd, FdFlags::CLOEXEC) {
            Ok(()) | Err(rustix::io::Errno::BADF) => {}
            Err(error) => return Err(error.into()),
        }
    }
    Ok(())
}

impl SupervisedChild for ChildSupervisor {
    fn poll(&mut self) -> bool {
        if let ChildLiveness::Exited(_) = self.liveness {
            return true;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.mark_exited(Some(status));
                true
            }
            Ok(None) => false,
            Err(error) => {
                // Nothing left to wait for, treat it as gone.
                tracing::warn!(message = "ChildSupervisor::poll -> try_wait failed", ?error);
                self.mark_exited(None);
                true
            }
        }
    }

    fn terminate(&mut self) {
        if self.poll() {
            return;
        }

        let Ok(raw_pid) = i32::try_from(self.child.id()) else {
            tracing::warn!(message = "ChildSupervisor::terminate -> pid out of range");
            return;
        };

        match kill(Pid::from_raw(raw_pid), Signal::SIGTERM) {
            // ESRCH: exited between poll() and kill().
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(error) => {
                tracing::warn!(message = "ChildSupervisor::terminate -> kill failed", ?error);
            }
        }
    }

    fn wait(&mut self) -> Option<ExitStatus> {
        if let ChildLiveness::Exited(maybe_status) = self.liveness {
            return maybe_status;
        }
        match self.child.wait() {
            Ok(status) => self.mark_exited(Some(status)),
            Err(error) => {
                tracing::warn!(message = "ChildSupervisor::wait failed", ?error);
                self.mark_exited(None)
            }
        }
    }
}

impl Drop for ChildSupervisor {
    fn drop(&mut self) {
        if self.liveness == ChildLiveness::Running {
            self.terminate();
            self.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reacquire_terminal;
    use pretty_assertions::assert_eq;
    use std::{os::unix::process::ExitStatusExt as _,
              path::PathBuf,
              time::{Duration, Instant}};

    /// `/bin/sh` is the program, so the "relay path" argument is the script to run.
    fn write_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("child.sh");
        std::fs::write(&path, body).unwrap();
        path
    }

    fn null_terminal() -> TerminalHandle {
        reacquire_terminal(Path::new("/no/such/tty"), Path::new("/dev/null")).unwrap()
    }

    fn wait_until_exited(child: &mut ChildSupervisor) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !child.poll() {
            assert!(Instant::now() < deadline, "child did not exit");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_spawn_passes_arg_env_and_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let script = write_script(
            dir.path(),
            &format!(
                "printf '%s|%s|' \"$0\" \"$TL_ALLOW_SIGNALS\" > {out}\ncat >> {out}\n",
                out = out.display()
            ),
        );

        // A regular file stands in for the terminal, so stdin content is observable.
        let fake_tty = dir.path().join("tty");
        std::fs::write(&fake_tty, b"keys").unwrap();
        let terminal = reacquire_terminal(&fake_tty, Path::new("/dev/null")).unwrap();

        let mut child =
            ChildSupervisor::spawn(Path::new("/bin/sh"), &script, &terminal).unwrap();
        let status = child.wait().unwrap();
        assert!(status.success());

        let actual = std::fs::read_to_string(&out).unwrap();
        assert_eq!(actual, format!("{}|1|keys", script.display()));
    }

    #[test]
    fn test_null_device_stdin_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let script = write_script(dir.path(), &format!("cat > {}\n", out.display()));

        let mut child =
            ChildSupervisor::spawn(Path::new("/bin/sh"), &script, &null_terminal())
                .unwrap();
        assert!(child.wait().unwrap().success());
        assert_eq!(std::fs::read(&out).unwrap(), b"");
    }

    #[test]
    fn test_poll_reports_exit() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "sleep 0.2\nexit 3\n");

        let mut child =
            ChildSupervisor::spawn(Path::new("/bin/sh"), &script, &null_terminal())
                .unwrap();
        assert!(!child.poll());
        wait_until_exited(&mut child);
        assert_eq!(child.wait().unwrap().code(), Some(3));
        assert_eq!(child.liveness(), ChildLiveness::Exited(child.wait()));
    }

    #[test]
    fn test_terminate_then_wait_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "exec sleep 30\n");

        let mut child =
            ChildSupervisor::spawn(Path::new("/bin/sh"), &script, &null_terminal())
                .unwrap();
        child.terminate();
        let first = child.wait().unwrap();
        assert_eq!(first.signal(), Some(Signal::SIGTERM as i32));

        child.terminate();
        assert_eq!(child.wait(), Some(first));
    }

    #[test]
    fn test_terminate_after_exit_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "exit 0\n");

        let mut child =
            ChildSupervisor::spawn(Path::new("/bin/sh"), &script, &null_terminal())
                .unwrap();
        wait_until_exited(&mut child);
        child.terminate();
        assert!(child.wait().unwrap().success());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_inherited_descriptors_do_not_reach_child() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let script = write_script(
            dir.path(),
            &format!(
                "for f in /proc/$$/fd/*; do readlink \"$f\"; done > {}\n",
                out.display()
            ),
        );

        // pipe(2) without flags: neither end is close-on-exec.
        let (reader, writer) = rustix::pipe::pipe().unwrap();
        let inode = rustix::fs::fstat(&reader).unwrap().st_ino;
        let pipe_link = format!("pipe:[{inode}]");

        let mut child =
            ChildSupervisor::spawn(Path::new("/bin/sh"), &script, &null_terminal())
                .unwrap();
        assert!(child.wait().unwrap().success());
        drop((reader, writer));

        let links = std::fs::read_to_string(&out).unwrap();
        assert!(!links.is_empty());
        assert!(!links.contains(&pipe_link), "{pipe_link} leaked: {links}");
    }

    #[test]
    fn test_spawn_error() {
        let result = ChildSupervisor::spawn(
            Path::new("/no/such/program"),
            Path::new("/tmp/tl_relay"),
            &null_terminal(),
        );
        let report = result.unwrap_err();
        assert!(report.to_string().contains("/no/such/program"), "{report}");
    }

    #[test]
    fn test_drop_reaps_running_child() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "exec sleep 30\n");

        let child =
            ChildSupervisor::spawn(Path::new("/bin/sh"), &script, &null_terminal())
                .unwrap();
        let raw_pid = i32::try_from(child.id()).unwrap();
        drop(child);

        // Reaped, so the pid no longer exists.
        assert_eq!(kill(Pid::from_raw(raw_pid), None), Err(Errno::ESRCH));
    }
}
