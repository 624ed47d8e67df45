use crate::error::Result;
use std::collections::HashMap;
use std::path::PathBuf;

/// Everything path resolution depends on, captured once
#[derive(Debug, Clone)]
pub struct PathContext {
    pub current_dir: PathBuf,
    pub vars: HashMap<String, String>,
}

impl PathContext {
    /// Capture the current directory and environment of this process
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            current_dir: std::env::current_dir()?,
            vars: std::env::vars().collect(),
        })
    }

    pub fn new(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            current_dir: current_dir.into(),
            vars: HashMap::new(),
        }
    }

    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Per-user application data folder
    pub fn app_data_dir(&self) -> Option<PathBuf> {
        if cfg!(windows) {
            return self.var("APPDATA").map(PathBuf::from);
        }

        self.var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| self.home_dir().map(|home| home.join(".config")))
    }

    pub fn home_dir(&self) -> Option<PathBuf> {
        self.var("HOME")
            .or_else(|| self.var("USERPROFILE"))
            .map(PathBuf::from)
    }

    fn placeholder(&self, name: &str) -> Option<PathBuf> {
        match name {
            "ProgramFiles" => self.var("ProgramFiles").map(PathBuf::from),
            "ProgramFilesX86" => self.var("ProgramFiles(x86)").map(PathBuf::from),
            "AppData" => self.app_data_dir(),
            "Home" => self.home_dir(),
            _ => None,
        }
    }
}

const PLACEHOLDERS: [&str; 4] = ["ProgramFiles", "ProgramFilesX86", "AppData", "Home"];

/// Turn a configured path into an absolute one
///
/// An empty path or `.` means the current directory. A leading `./` (or `.\`)
/// is anchored at the current directory, `{{Placeholder}}` tokens and `$VAR`
/// references are substituted, and anything still relative is joined onto the
/// current directory. Unknown tokens are left in place.
pub fn resolve_path(raw: &str, ctx: &PathContext) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() || raw == "." {
        return ctx.current_dir.clone();
    }

    let mut path = raw.to_string();
    for name in PLACEHOLDERS {
        let token = format!("{{{{{}}}}}", name);
        if path.contains(&token) {
            if let Some(value) = ctx.placeholder(name) {
                path = path.replace(&token, &value.to_string_lossy());
            }
        }
    }

    let path = expand_env_vars(&path, ctx);

    if let Some(rest) = path.strip_prefix("./").or_else(|| path.strip_prefix(".\\")) {
        return ctx.current_dir.join(rest);
    }

    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        ctx.current_dir.join(path)
    }
}

/// Expand `$VAR` and `${VAR}` references; unknown variables are kept verbatim
pub fn expand_env_vars(s: &str, ctx: &PathContext) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match ctx.vars.get(name) {
            Some(value) if !name.is_empty() => {
                result.push_str(value);
                rest = &after[consumed..];
            }
            _ => {
                result.push('$');
                rest = after;
            }
        }
    }

    result.push_str(rest);
    result
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn ctx() -> PathContext {
        PathContext::new("/work")
            .with_var("HOME", "/home/alice")
            .with_var("ProgramFiles", "/opt/programs")
            .with_var("APP", "server")
    }

    #[test]
    fn test_empty_and_dot_mean_current_dir() {
        assert_eq!(resolve_path("", &ctx()), PathBuf::from("/work"));
        assert_eq!(resolve_path(".", &ctx()), PathBuf::from("/work"));
    }

    #[test]
    fn test_dot_prefix_is_anchored() {
        assert_eq!(resolve_path("./bin/app", &ctx()), PathBuf::from("/work/bin/app"));
        assert_eq!(resolve_path(".\\app", &ctx()), PathBuf::from("/work/app"));
    }

    #[test]
    fn test_relative_path_is_anchored() {
        assert_eq!(resolve_path("test", &ctx()), PathBuf::from("/work/test"));
    }

    #[test]
    fn test_absolute_path_unchanged() {
        assert_eq!(resolve_path("/usr/bin/env", &ctx()), PathBuf::from("/usr/bin/env"));
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(
            resolve_path("{{ProgramFiles}}/test", &ctx()),
            PathBuf::from("/opt/programs/test")
        );
        assert_eq!(
            resolve_path("{{Home}}/bin/app", &ctx()),
            PathBuf::from("/home/alice/bin/app")
        );
        assert_eq!(
            resolve_path("{{AppData}}/tool", &ctx()),
            PathBuf::from("/home/alice/.config/tool")
        );
    }

    #[test]
    fn test_unavailable_placeholder_is_kept() {
        let resolved = resolve_path("{{ProgramFilesX86}}/test", &ctx());
        assert_eq!(resolved, PathBuf::from("/work/{{ProgramFilesX86}}/test"));
    }

    #[test]
    fn test_expand_env_vars() {
        let ctx = ctx();
        assert_eq!(expand_env_vars("$HOME/$APP", &ctx), "/home/alice/server");
        assert_eq!(expand_env_vars("${APP}-1", &ctx), "server-1");
        assert_eq!(expand_env_vars("$MISSING/x", &ctx), "$MISSING/x");
        assert_eq!(expand_env_vars("cost: $", &ctx), "cost: $");
        assert_eq!(expand_env_vars("${unterminated", &ctx), "${unterminated");
    }

    #[test]
    fn test_app_data_prefers_xdg() {
        let ctx = ctx().with_var("XDG_CONFIG_HOME", "/xdg");
        assert_eq!(ctx.app_data_dir(), Some(PathBuf::from("/xdg")));
    }
}
