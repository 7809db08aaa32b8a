use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn export_candidate(dir: &Path, file_name: &str, stamp: &str, attempt: u32) -> PathBuf {
    let stem = file_name.strip_suffix(".csv").unwrap_or(file_name);
    match attempt {
        0 => dir.join(file_name),
        1 => dir.join(format!("{stem}_{stamp}.csv")),
        n => dir.join(format!("{stem}_{stamp}_{n}.csv")),
    }
}

/// Create a participant export file. An existing file is never
/// overwritten: the new export gets a timestamp suffix, then a counter when
/// the timestamped name is taken too.
///
/// # Errors
///
/// Returns any I/O error other than the name already existing.
pub fn create_export(
    dir: &Path,
    file_name: &str,
    now: DateTime<Utc>,
) -> io::Result<(PathBuf, File)> {
    let stamp = now.format("%Y%m%dT%H%M%S").to_string();
    let mut attempt = 0;
    loop {
        let path = export_candidate(dir, file_name, &stamp, attempt);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                log::debug!("{} exists, trying another name", path.display());
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
