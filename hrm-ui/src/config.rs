//! Configuration resolution for hrm-ui
//!
//! The data folder (which holds the database) is resolved with the
//! priority: command-line argument, environment variable, TOML config
//! file, OS-dependent default.

use std::path::PathBuf;

/// Resolve the data folder.
pub fn resolve_data_folder(cli_arg: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.clone();
    }

    if let Ok(path) = std::env::var("HRM_ROOT_FOLDER") {
        return PathBuf::from(path);
    }

    if let Some(config_path) = config_file_path() {
        if let Ok(content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&content) {
                if let Some(root) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root);
                }
            }
        }
    }

    default_data_folder()
}

/// Path of the database file inside the data folder.
pub fn database_path(data_folder: &std::path::Path) -> PathBuf {
    data_folder.join("hrm.db")
}

fn config_file_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("hrm").join("config.toml"));
    if let Some(path) = &user_config {
        if path.exists() {
            return user_config;
        }
    }
    let system_config = PathBuf::from("/etc/hrm/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }
    None
}

fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("hrm"))
        .unwrap_or_else(|| PathBuf::from("./hrm_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins() {
        let cli = PathBuf::from("/tmp/hrm-test");
        assert_eq!(resolve_data_folder(Some(&cli)), cli);
    }

    #[test]
    fn database_lives_inside_the_data_folder() {
        let folder = PathBuf::from("/var/lib/hrm");
        assert_eq!(database_path(&folder), PathBuf::from("/var/lib/hrm/hrm.db"));
    }
}
