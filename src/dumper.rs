use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::prelude::*;

/// Writes `data` to `<directory>/<filename_root>_<local timestamp>.bin` and
/// returns the path written.
pub fn dump(directory: impl AsRef<Path>, filename_root: &str, data: &[u8]) -> io::Result<PathBuf> {
    let directory = directory.as_ref();
    fs::create_dir_all(directory)?;
    let now: DateTime<Local> = Local::now();
    let filename = directory.join(format!(
        "{}_{}.bin",
        filename_root,
        now.format("%Y-%m-%d_%H-%M-%S%.3f")
    ));
    fs::write(&filename, data)?;
    Ok(filename)
}
