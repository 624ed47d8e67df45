use crate::error::{Result, WatchdogError};
use crate::process::spec::ProcessSpec;
use std::process::Stdio;
use tokio::process::{Child, Command};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// A freshly started child process
#[derive(Debug)]
pub struct SpawnedProcess {
    /// The child process handle
    pub child: Child,

    /// Process ID assigned by the OS
    pub pid: u32,
}

impl SpawnedProcess {
    /// Kill the child and wait until it has been reaped
    pub async fn kill(&mut self) -> Result<()> {
        self.child.kill().await.map_err(|e| {
            WatchdogError::SpawnError(format!("Failed to kill PID {}: {}", self.pid, e))
        })
    }
}

/// Start one instance of `spec`
///
/// The returned `Child` owns the OS handle, so its exit status is retained
/// until someone waits on it and no exit can be missed between start and
/// observation.
pub fn launch(spec: &ProcessSpec) -> Result<SpawnedProcess> {
    let mut command = build_command(spec)?;

    let child = command.spawn().map_err(|e| {
        WatchdogError::SpawnError(format!(
            "Failed to spawn process '{}': {}",
            spec.label(),
            e
        ))
    })?;

    // Only None once the child has been reaped, which cannot happen before the first wait
    let pid = child.id().ok_or_else(|| {
        WatchdogError::SpawnError(format!("Failed to get PID for process '{}'", spec.label()))
    })?;

    Ok(SpawnedProcess { child, pid })
}

/// Build the launch request for `spec` without starting it
pub fn build_command(spec: &ProcessSpec) -> Result<Command> {
    let mut command = Command::new(&spec.executable_path);
    command.current_dir(&spec.working_directory);

    apply_arguments(&mut command, &spec.arguments)?;

    if spec.hide_shell_window {
        hide_window(&mut command);
    } else {
        command.stdin(Stdio::inherit());
        command.stdout(Stdio::inherit());
        command.stderr(Stdio::inherit());
    }

    Ok(command)
}

/// Split an argument string into argv entries by shell-word rules
///
/// No shell is involved; quoting only groups words.
pub fn split_arguments(
    arguments: &str,
) -> std::result::Result<Vec<String>, shell_words::ParseError> {
    shell_words::split(arguments)
}

#[cfg(windows)]
fn apply_arguments(command: &mut Command, arguments: &str) -> Result<()> {
    // Windows programs parse their own command line, so hand it over untouched
    if !arguments.is_empty() {
        command.raw_arg(arguments);
    }
    Ok(())
}

#[cfg(not(windows))]
fn apply_arguments(command: &mut Command, arguments: &str) -> Result<()> {
    let args = split_arguments(arguments).map_err(|e| {
        WatchdogError::SpawnError(format!("Cannot parse arguments '{}': {}", arguments, e))
    })?;
    command.args(args);
    Ok(())
}

#[cfg(windows)]
fn hide_window(command: &mut Command) {
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_window(command: &mut Command) {
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_spec(executable: &str, arguments: &str) -> ProcessSpec {
        ProcessSpec::new("/tmp", executable, arguments)
    }

    #[tokio::test]
    async fn test_launch_simple_process() {
        let spec = create_test_spec("/bin/true", "");

        let mut spawned = launch(&spec).unwrap();
        assert!(spawned.pid > 0);

        let status = spawned.child.wait().await.unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn test_launch_passes_arguments() {
        let spec = create_test_spec("/bin/sh", "-c 'exit 7'");

        let mut spawned = launch(&spec).unwrap();
        let status = spawned.child.wait().await.unwrap();
        assert_eq!(status.code(), Some(7));
    }

    #[tokio::test]
    async fn test_launch_uses_working_directory() {
        let temp_dir = TempDir::new().unwrap();
        let marker = temp_dir.path().join("marker");
        let spec = ProcessSpec::new(temp_dir.path(), "/bin/sh", "-c 'touch marker'");

        let mut spawned = launch(&spec).unwrap();
        spawned.child.wait().await.unwrap();

        assert!(marker.exists());
    }

    #[tokio::test]
    async fn test_launch_hidden_process() {
        let spec = create_test_spec("/bin/echo", "hidden").hidden(true);

        let mut spawned = launch(&spec).unwrap();
        assert!(spawned.child.stdout.is_none());
        let status = spawned.child.wait().await.unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn test_launch_nonexistent_executable() {
        let spec = create_test_spec("/nonexistent/program", "");

        match launch(&spec) {
            Err(WatchdogError::SpawnError(msg)) => {
                assert!(msg.contains("/nonexistent/program"));
            }
            other => panic!("Expected SpawnError, got {:?}", other.map(|s| s.pid)),
        }
    }

    #[tokio::test]
    async fn test_launch_invalid_working_directory() {
        let spec = ProcessSpec::new(PathBuf::from("/nonexistent/directory"), "/bin/true", "");

        assert!(matches!(launch(&spec), Err(WatchdogError::SpawnError(_))));
    }

    #[tokio::test]
    async fn test_kill_reaps_child() {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let spec = create_test_spec("/bin/sleep", "5");
        let mut spawned = launch(&spec).unwrap();

        spawned.kill().await.unwrap();

        let status = spawned.child.try_wait().unwrap().expect("child was not reaped");
        assert!(!status.success());
        assert_eq!(
            std::os::unix::process::ExitStatusExt::signal(&status),
            Some(Signal::SIGKILL as i32)
        );
        // No zombie left behind under the old PID
        assert!(kill(Pid::from_raw(spawned.pid as i32), None).is_err());
    }

    #[test]
    fn test_split_arguments() {
        assert!(split_arguments("").unwrap().is_empty());
        assert_eq!(
            split_arguments(r#"--name "my app" -v"#).unwrap(),
            vec!["--name", "my app", "-v"]
        );
        assert!(split_arguments("\"unterminated").is_err());
    }
}
