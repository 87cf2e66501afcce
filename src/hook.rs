//! Lifecycle hook execution: `post-create` and `pre-delete`.
//!
//! Every hook spawn goes through one code path, and waits on `wait_timeout`
//! to poll the child without blocking forever. The two-phase cancellation
//! protocol (cooperative stop, then forceful kill) is built from
//! `nix::sys::signal::kill`.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use wait_timeout::ChildExt;

use crate::error::WtError;
use crate::metadata::WorktreeMetadata;

/// Hard ceiling on hook runtime, regardless of cancellation.
const HARD_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Grace window after the cooperative stop signal before a forceful kill.
const COOPERATIVE_GRACE: Duration = Duration::from_secs(7);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run `<main_repo_root>/.wt/hooks/<hook_name>` for `worktree_path`, if it
/// exists. A missing hook is a silent no-op success; a present-but-not-
/// executable hook is `HookNotExecutable`. `cancelled` is polled between
/// waits so a signal-coordinator cancellation can trigger the two-phase
/// stop.
pub fn run(
    hook_name: &str,
    main_repo_root: &Path,
    worktree_path: &Path,
    metadata: &WorktreeMetadata,
    cancelled: &Arc<AtomicBool>,
) -> Result<()> {
    let hook_path = main_repo_root.join(".wt").join("hooks").join(hook_name);
    if !crate::fs::exists(&hook_path) {
        return Ok(());
    }
    if !crate::fs::is_executable(&hook_path) {
        return Err(WtError::HookNotExecutable { path: hook_path }.into());
    }

    log::debug!("hook({hook_name}): running {}", hook_path.display());

    let mut cmd = Command::new(&hook_path);
    cmd.current_dir(worktree_path)
        .env("WT_ID", metadata.id.to_string())
        .env("WT_AGENT_ID", &metadata.agent_id)
        .env("WT_NAME", &metadata.name)
        .env("WT_PATH", worktree_path)
        .env("WT_BASE_BRANCH", &metadata.base_branch)
        .env("WT_REPO_ROOT", main_repo_root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn hook {}", hook_path.display()))?;

    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");
    let out_name = hook_name.to_string();
    let err_name = hook_name.to_string();
    let out_thread = thread::spawn(move || stream_prefixed(stdout, &out_name, false));
    let err_thread = thread::spawn(move || stream_prefixed(stderr, &err_name, true));

    let outcome = wait_with_cancellation(&mut child, cancelled)?;

    let _ = out_thread.join();
    let _ = err_thread.join();

    match outcome {
        Outcome::Exited(status) if status.success() => Ok(()),
        Outcome::Exited(status) => Err(WtError::HookFailed {
            name: hook_name.to_string(),
            code: status.code().unwrap_or(-1),
        }
        .into()),
        Outcome::Cancelled => {
            log::debug!("hook({hook_name}): killed after cancellation");
            Err(WtError::Interrupted.into())
        }
        Outcome::TimedOut => {
            log::debug!("hook({hook_name}): exceeded 5 minute hard timeout");
            Err(WtError::HookTimeout { name: hook_name.to_string() }.into())
        }
    }
}

enum Outcome {
    Exited(std::process::ExitStatus),
    Cancelled,
    TimedOut,
}

/// Poll `child` until it exits, the hard timeout elapses, or `cancelled`
/// flips — in which case run the two-phase stop (cooperative signal, 7s
/// grace, forceful kill).
fn wait_with_cancellation(child: &mut Child, cancelled: &Arc<AtomicBool>) -> Result<Outcome> {
    let start = Instant::now();
    loop {
        if let Some(status) = child
            .wait_timeout(POLL_INTERVAL)
            .context("failed to poll hook process")?
        {
            return Ok(Outcome::Exited(status));
        }

        if cancelled.load(Ordering::SeqCst) {
            return Ok(cancel_hook(child)?);
        }
        if start.elapsed() >= HARD_TIMEOUT {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(Outcome::TimedOut);
        }
    }
}

/// Send the cooperative stop signal, wait up to [`COOPERATIVE_GRACE`], then
/// force-kill if the process is still alive.
fn cancel_hook(child: &mut Child) -> Result<Outcome> {
    send_cooperative_stop(child);
    let grace_start = Instant::now();
    loop {
        if child
            .wait_timeout(POLL_INTERVAL)
            .context("failed to poll hook process during cancellation")?
            .is_some()
        {
            return Ok(Outcome::Cancelled);
        }
        if grace_start.elapsed() >= COOPERATIVE_GRACE {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(Outcome::Cancelled);
        }
    }
}

#[cfg(unix)]
fn send_cooperative_stop(child: &Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    let pid = Pid::from_raw(child.id() as i32);
    if let Err(e) = kill(pid, Signal::SIGTERM) {
        log::warn!("failed to send SIGTERM to hook pid {pid}: {e}");
    }
}

#[cfg(not(unix))]
fn send_cooperative_stop(child: &Child) {
    // No portable cooperative-stop signal outside unix; fall through to the
    // grace-window poll, which will forcefully kill once it elapses.
    let _ = child;
}

/// Copy `reader`'s lines to the engine's stdout/stderr, each prefixed with
/// `hook(<name>): `. Line-buffered so interleaved hook output from retried
/// merges stays readable.
fn stream_prefixed(reader: impl std::io::Read, name: &str, is_stderr: bool) {
    let reader = BufReader::new(reader);
    for line in reader.lines() {
        let Ok(line) = line else { break };
        if is_stderr {
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "hook({name}): {line}");
        } else {
            let mut stdout = std::io::stdout();
            let _ = writeln!(stdout, "hook({name}): {line}");
        }
    }
}
