use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let user_data_dir = discover_user_data_dir(&project_root);
        Self::with_dirs(project_root, user_data_dir)
    }

    /// Builds paths rooted at explicit directories, creating the log dir.
    pub fn with_dirs(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        let secrets_path = user_data_dir.join("secrets.yaml");

        for dir in [&user_data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            project_root,
            user_data_dir,
            log_dir,
            secrets_path,
        }
    }

    /// Resolves a configured path; relative paths are taken from the project root.
    pub fn resolve(&self, raw: &str) -> PathBuf {
        let candidate = PathBuf::from(raw);
        if candidate.is_absolute() {
            return candidate;
        }
        self.project_root.join(candidate)
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-empty path from an environment variable.
fn env_dir(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// `DECISION_BOT_ROOT`, else the nearest directory at or above the working
/// directory holding `config.yml`, else the working directory itself.
fn discover_project_root() -> PathBuf {
    if let Some(root) = env_dir("DECISION_BOT_ROOT") {
        return root;
    }
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_config_root(&cwd).unwrap_or(cwd)
}

fn find_config_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join("config.yml").is_file())
        .map(Path::to_path_buf)
}

/// Logs and `secrets.yaml` live next to the project unless `DECISION_BOT_DATA_DIR` says otherwise.
fn discover_user_data_dir(project_root: &Path) -> PathBuf {
    env_dir("DECISION_BOT_DATA_DIR").unwrap_or_else(|| project_root.to_path_buf())
}
