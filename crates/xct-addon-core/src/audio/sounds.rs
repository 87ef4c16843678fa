use crate::{CoreError, CoreResult};

use std::{
    fs,
    panic::Location,
    path::{Path, PathBuf},
};

use error_location::ErrorLocation;
use tracing::{debug, error};

/// Extensions offered in the sound picker.
const SOUND_EXTENSIONS: [&str; 2] = ["mp3", "wav"];

/// Locates sound files: the user directory first, then the bundled fallback.
#[derive(Debug, Clone)]
pub struct SoundLibrary {
    user_dir: PathBuf,
    bundled_dir: Option<PathBuf>,
}

impl SoundLibrary {
    /// Library over a user directory and an optional bundled directory.
    pub fn new(user_dir: impl Into<PathBuf>, bundled_dir: Option<PathBuf>) -> Self {
        Self {
            user_dir: user_dir.into(),
            bundled_dir,
        }
    }

    /// Directory holding user-supplied sounds.
    pub fn user_dir(&self) -> &Path {
        &self.user_dir
    }

    /// Full path of `file`, preferring the user copy.
    #[track_caller]
    pub fn resolve(&self, file: &str) -> CoreResult<PathBuf> {
        let is_plain_name = Path::new(file)
            .file_name()
            .is_some_and(|name| name == file);
        if !is_plain_name {
            return Err(CoreError::SoundNotFound {
                file: file.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let user_path = self.user_dir.join(file);
        if user_path.is_file() {
            return Ok(user_path);
        }

        if let Some(bundled_dir) = &self.bundled_dir {
            let bundled_path = bundled_dir.join(file);
            if bundled_path.is_file() {
                return Ok(bundled_path);
            }
        }

        error!(
            file,
            user_dir = %self.user_dir.display(),
            bundled_dir = ?self.bundled_dir,
            "Sound file does not exist"
        );
        log_directory_contents(&self.user_dir);
        if let Some(bundled_dir) = &self.bundled_dir {
            log_directory_contents(bundled_dir);
        }

        Err(CoreError::SoundNotFound {
            file: file.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Sorted, de-duplicated names of playable files in both directories.
    pub fn list(&self) -> CoreResult<Vec<String>> {
        let mut names = sound_files_in(&self.user_dir)?;
        if let Some(bundled_dir) = &self.bundled_dir {
            names.extend(sound_files_in(bundled_dir)?);
        }
        names.sort();
        names.dedup();
        Ok(names)
    }
}

fn sound_files_in(dir: &Path) -> CoreResult<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let playable = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SOUND_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if !playable || !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

fn log_directory_contents(dir: &Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        debug!(dir = %dir.display(), "Directory does not exist");
        return;
    };

    let mut empty = true;
    for entry in entries.flatten() {
        empty = false;
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        debug!(dir = %dir.display(), name = ?entry.file_name(), size, "Directory entry");
    }
    if empty {
        debug!(dir = %dir.display(), "Directory is empty");
    }
}
