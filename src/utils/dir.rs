use std::{env, io, path::PathBuf};

use anyhow::{Context, Result};

pub const APPLICATION_NAME: &str = "Flows";

/// Directory the tracker writes its day logs into. On every platform this is
/// `$HOME/Documents/Flows` (`%USERPROFILE%` on Windows).
pub fn default_data_path() -> Result<PathBuf> {
    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("Couldn't find neither HOME nor USERPROFILE")?;
    let mut path = PathBuf::from(home);
    path.push("Documents");
    path.push(APPLICATION_NAME);
    Ok(path)
}

pub fn create_application_default_path() -> Result<PathBuf> {
    let path = default_data_path()?;

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}
