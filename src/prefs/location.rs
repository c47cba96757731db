use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const APP_NAME: &str = "lieutenant";

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "LT_CFG";

/// Config file name, looked up in the working directory and then in `$HOME`
pub const CONFIG_FILE: &str = ".lt_cfg.json";

const LOG_FILE: &str = "lt.log";

/// Locate the config file for this process.
///
/// Precedence: `$LT_CFG`, then `./.lt_cfg.json`, then `~/.lt_cfg.json`.
/// The first candidate that exists wins; `None` means defaults only.
pub fn resolve_path() -> Option<PathBuf> {
    let env_override = std::env::var_os(CONFIG_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);
    let local = Path::new(".").join(CONFIG_FILE);
    let home = dirs::home_dir().map(|home| home.join(CONFIG_FILE));

    if let Some(ref path) = env_override
        && !path.is_file()
    {
        tracing::warn!(
            "{} points at {}, which does not exist; falling back",
            CONFIG_ENV_VAR,
            path.display()
        );
    }

    resolve_from(env_override.as_deref(), &local, home.as_deref())
}

/// Pure form of [`resolve_path`] over explicit candidates
pub fn resolve_from(
    env_override: Option<&Path>,
    local: &Path,
    home: Option<&Path>,
) -> Option<PathBuf> {
    [env_override, Some(local), home]
        .into_iter()
        .flatten()
        .find(|candidate| candidate.is_file())
        .map(Path::to_path_buf)
}

/// Where a store with no resolved location is saved
pub fn default_save_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_FILE))
        .ok_or(Error::NoHomeDir)
}

/// Get the application data directory (holds the log file)
pub fn get_app_data_dir() -> Option<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    base.map(|base| base.join(APP_NAME))
}

/// Path of the log file written while the interactive UI owns the terminal
pub fn get_log_path() -> Option<PathBuf> {
    get_app_data_dir().map(|dir| dir.join(LOG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::fs;
    use std::sync::{Mutex, MutexGuard};

    /// Serializes tests that change `LT_CFG` for the whole process
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Holds `LT_CFG` at a test value and puts the old value back on drop
    struct EnvGuard {
        previous: Option<OsString>,
        _lock: MutexGuard<'static, ()>,
    }

    impl EnvGuard {
        fn set(value: &std::ffi::OsStr) -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let previous = std::env::var_os(CONFIG_ENV_VAR);
            // SAFETY: every test touching the environment holds ENV_LOCK
            unsafe { std::env::set_var(CONFIG_ENV_VAR, value) };
            EnvGuard {
                previous,
                _lock: lock,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            // SAFETY: ENV_LOCK is still held
            unsafe {
                match self.previous.take() {
                    Some(value) => std::env::set_var(CONFIG_ENV_VAR, value),
                    None => std::env::remove_var(CONFIG_ENV_VAR),
                }
            }
        }
    }

    fn fallback_candidates() -> Option<PathBuf> {
        let home = dirs::home_dir().map(|home| home.join(CONFIG_FILE));
        resolve_from(None, &Path::new(".").join(CONFIG_FILE), home.as_deref())
    }

    fn touch(path: &Path) {
        fs::write(path, "{}").unwrap();
    }

    #[test]
    fn test_resolve_path_reads_env_var() {
        let dir = tempfile::tempdir().unwrap();
        let env = dir.path().join("from_env.json");
        touch(&env);

        let _guard = EnvGuard::set(env.as_os_str());
        assert_eq!(resolve_path(), Some(env));
    }

    #[test]
    fn test_resolve_path_empty_env_var_is_unset() {
        let _guard = EnvGuard::set(std::ffi::OsStr::new(""));
        assert_eq!(resolve_path(), fallback_candidates());
    }

    #[test]
    fn test_resolve_path_missing_env_target_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let env = dir.path().join("missing.json");

        let _guard = EnvGuard::set(env.as_os_str());
        let resolved = resolve_path();
        assert_ne!(resolved, Some(env));
        assert_eq!(resolved, fallback_candidates());
    }

    #[test]
    fn test_env_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let env = dir.path().join("env.json");
        let local = dir.path().join("local.json");
        let home = dir.path().join("home.json");
        touch(&env);
        touch(&local);
        touch(&home);

        assert_eq!(resolve_from(Some(&env), &local, Some(&home)), Some(env));
    }

    #[test]
    fn test_local_before_home() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("local.json");
        let home = dir.path().join("home.json");
        touch(&local);
        touch(&home);

        assert_eq!(resolve_from(None, &local, Some(&home)), Some(local));
    }

    #[test]
    fn test_home_only() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("local.json");
        let home = dir.path().join("home.json");
        touch(&home);

        assert_eq!(resolve_from(None, &local, Some(&home)), Some(home));
    }

    #[test]
    fn test_missing_env_target_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        let env = dir.path().join("missing.json");
        let local = dir.path().join("local.json");
        touch(&local);

        assert_eq!(resolve_from(Some(&env), &local, None), Some(local));
    }

    #[test]
    fn test_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("local.json");
        let home = dir.path().join("home.json");

        assert_eq!(resolve_from(None, &local, Some(&home)), None);
    }

    #[test]
    fn test_directory_is_not_a_config() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("local.json");
        fs::create_dir(&local).unwrap();

        assert_eq!(resolve_from(None, &local, None), None);
    }
}
