use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;
use editconfig::CONFIG_FILE_NAME;

pub const ENV_CONFIG_DIR: &str = "PHOTOEDIT_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Photoedit";
const APPLICATION: &str = "Photoedit";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        if let Some(config_dir) = env_override(ENV_CONFIG_DIR) {
            return Ok(Self { config_dir });
        }
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self {
            config_dir: project_dirs.config_dir().to_path_buf(),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    static ENV: Mutex<()> = Mutex::new(());

    /// Runs `check` with the config override set to `value`, restoring the
    /// previous environment afterwards.
    fn with_override(value: Option<&Path>, check: impl FnOnce()) {
        let _lock = ENV.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let saved = env::var_os(ENV_CONFIG_DIR);
        match value {
            Some(dir) => env::set_var(ENV_CONFIG_DIR, dir),
            None => env::remove_var(ENV_CONFIG_DIR),
        }
        check();
        match saved {
            Some(previous) => env::set_var(ENV_CONFIG_DIR, previous),
            None => env::remove_var(ENV_CONFIG_DIR),
        }
    }

    #[test]
    fn override_dir_wins() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("config");
        with_override(Some(&dir), || {
            let paths = AppPaths::discover().unwrap();
            assert_eq!(paths.config_dir(), dir.as_path());
            assert_eq!(paths.config_file(), dir.join("editor.toml"));
        });
    }

    #[test]
    fn without_override_uses_project_dirs() {
        with_override(None, || {
            if let Ok(paths) = AppPaths::discover() {
                assert!(paths.config_file().ends_with(CONFIG_FILE_NAME));
            }
        });
    }
}
