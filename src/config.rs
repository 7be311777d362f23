use std::path::PathBuf;

use eyre::OptionExt;

pub trait ConfigManager: Sized + Clone + Send + Sync {
    fn get_db_path(&self) -> eyre::Result<String>;
    fn get_log_dir(&self) -> eyre::Result<String>;
}

#[derive(Default, Clone, Debug)]
pub struct LocalConfigManager {}

impl LocalConfigManager {
    pub fn new() -> Self {
        Self {}
    }
}

#[cfg(not(target_os = "windows"))]
pub fn home_dir() -> eyre::Result<PathBuf> {
    let home = std::env::var("HOME").map_err(|_| eyre::eyre!("$HOME not found"))?;
    Ok(PathBuf::from(home))
}

#[cfg(target_os = "windows")]
pub fn home_dir() -> eyre::Result<PathBuf> {
    let home = std::env::var("USERPROFILE").map_err(|_| eyre::eyre!("%userprofile% not found"))?;
    Ok(PathBuf::from(home))
}

pub fn data_dir() -> eyre::Result<PathBuf> {
    let data_dir = match std::env::var("XDG_DATA_HOME") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => home_dir()?.join(".local").join("share"),
    };

    Ok(data_dir.join("sitelog"))
}

fn to_string(path: PathBuf) -> eyre::Result<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_eyre("Can't construct path in data dir!")
}

impl ConfigManager for LocalConfigManager {
    fn get_db_path(&self) -> eyre::Result<String> {
        to_string(data_dir()?.join("db.sqlite3"))
    }

    fn get_log_dir(&self) -> eyre::Result<String> {
        to_string(data_dir()?.join("logs"))
    }
}
