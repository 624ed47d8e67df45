use crate::error::{Result, SpecError, WatchdogError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Description of one external program to keep alive
///
/// Specs are resolved and validated once at startup and are read-only
/// afterwards. Every restart of the same program reuses the same spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSpec {
    /// Directory the child is started in
    #[serde(default)]
    pub working_directory: PathBuf,

    /// Path to the executable to run
    #[serde(default)]
    pub executable_path: PathBuf,

    /// Command-line arguments as one string
    #[serde(default)]
    pub arguments: String,

    /// Start the child without a visible console window
    #[serde(default)]
    pub hide_shell_window: bool,
}

impl ProcessSpec {
    pub fn new(
        working_directory: impl Into<PathBuf>,
        executable_path: impl Into<PathBuf>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            working_directory: working_directory.into(),
            executable_path: executable_path.into(),
            arguments: arguments.into(),
            hide_shell_window: false,
        }
    }

    pub fn hidden(mut self, hide_shell_window: bool) -> Self {
        self.hide_shell_window = hide_shell_window;
        self
    }

    /// Check the launch preconditions, reporting the first one that fails
    pub fn validate(&self) -> std::result::Result<(), SpecError> {
        if !self.working_directory.is_dir() {
            return Err(SpecError::WorkingDirectoryMissing(
                self.working_directory.clone(),
            ));
        }

        if self.executable_path.as_os_str().is_empty() {
            return Err(SpecError::ExecutableNotSet);
        }

        if !self.executable_path.is_file() {
            return Err(SpecError::ExecutableMissing(self.executable_path.clone()));
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Short label used in log lines
    pub fn label(&self) -> String {
        self.executable_path.display().to_string()
    }
}

/// Validate a whole set of specs: it must be non-empty and every member valid
///
/// On Unix the argument string must also split into an argv, otherwise the
/// spec could never be launched.
pub fn validate_all(specs: &[ProcessSpec]) -> Result<()> {
    if specs.is_empty() {
        return Err(WatchdogError::NoProcesses);
    }

    for (index, spec) in specs.iter().enumerate() {
        spec.validate()
            .map_err(|source| WatchdogError::InvalidSpec { index, source })?;

        #[cfg(not(windows))]
        crate::process::spawner::split_arguments(&spec.arguments).map_err(|e| {
            WatchdogError::InvalidArguments {
                index,
                reason: e.to_string(),
            }
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn executable_in(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("app");
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        path
    }

    #[test]
    fn test_valid_spec() {
        let dir = TempDir::new().unwrap();
        let exe = executable_in(&dir);

        let spec = ProcessSpec::new(dir.path(), exe, "");
        assert!(spec.is_valid());
    }

    #[test]
    fn test_missing_working_directory() {
        let dir = TempDir::new().unwrap();
        let exe = executable_in(&dir);

        let spec = ProcessSpec::new("/nonexistent/directory", exe, "");
        assert_eq!(
            spec.validate(),
            Err(SpecError::WorkingDirectoryMissing(PathBuf::from(
                "/nonexistent/directory"
            )))
        );
        assert!(!spec.is_valid());
    }

    #[test]
    fn test_working_directory_is_a_file() {
        let dir = TempDir::new().unwrap();
        let exe = executable_in(&dir);

        let spec = ProcessSpec::new(&exe, &exe, "");
        assert!(matches!(
            spec.validate(),
            Err(SpecError::WorkingDirectoryMissing(_))
        ));
    }

    #[test]
    fn test_empty_executable() {
        let dir = TempDir::new().unwrap();

        let spec = ProcessSpec::new(dir.path(), "", "");
        assert_eq!(spec.validate(), Err(SpecError::ExecutableNotSet));
    }

    #[test]
    fn test_missing_executable() {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join("missing");

        let spec = ProcessSpec::new(dir.path(), &exe, "");
        assert_eq!(spec.validate(), Err(SpecError::ExecutableMissing(exe)));
    }

    #[test]
    fn test_executable_is_a_directory() {
        let dir = TempDir::new().unwrap();

        let spec = ProcessSpec::new(dir.path(), dir.path(), "");
        assert!(matches!(
            spec.validate(),
            Err(SpecError::ExecutableMissing(_))
        ));
    }

    #[test]
    fn test_validate_all_empty() {
        assert!(matches!(validate_all(&[]), Err(WatchdogError::NoProcesses)));
    }

    #[test]
    fn test_validate_all_reports_index() {
        let dir = TempDir::new().unwrap();
        let exe = executable_in(&dir);

        let specs = vec![
            ProcessSpec::new(dir.path(), &exe, ""),
            ProcessSpec::new(dir.path(), "", ""),
        ];

        match validate_all(&specs) {
            Err(WatchdogError::InvalidSpec { index, source }) => {
                assert_eq!(index, 1);
                assert_eq!(source, SpecError::ExecutableNotSet);
            }
            other => panic!("Expected InvalidSpec, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_all_rejects_unparsable_arguments() {
        let dir = TempDir::new().unwrap();
        let exe = executable_in(&dir);

        let specs = vec![
            ProcessSpec::new(dir.path(), &exe, "--name \"my app\""),
            ProcessSpec::new(dir.path(), &exe, "'unbalanced"),
        ];

        match validate_all(&specs) {
            Err(WatchdogError::InvalidArguments { index, reason }) => {
                assert_eq!(index, 1);
                assert!(!reason.is_empty());
            }
            other => panic!("Expected InvalidArguments, got {:?}", other),
        }
    }

    #[test]
    fn test_deserialize_camel_case_with_defaults() {
        let json = r#"{ "workingDirectory": "/tmp", "executablePath": "/bin/true" }"#;
        let spec: ProcessSpec = serde_json::from_str(json).unwrap();

        assert_eq!(spec.working_directory, PathBuf::from("/tmp"));
        assert_eq!(spec.executable_path, PathBuf::from("/bin/true"));
        assert_eq!(spec.arguments, "");
        assert!(!spec.hide_shell_window);
    }
}
