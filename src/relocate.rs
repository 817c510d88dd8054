//! Collision-safe relocation of settled files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::WatchError;

fn io_failure(path: &Path, source: io::Error) -> WatchError {
    WatchError::RelocationFailed {
        path: path.to_path_buf(),
        source,
    }
}

/// Move `source` into `dest_dir`, never overwriting an existing file.
///
/// The destination directory is created when missing. When the plain name
/// is taken, numeric suffixes (`a_1.png`, `a_2.png`, ...) are probed until a
/// free name is found. Returns the path the file now lives at. The move is
/// a single `rename`, so a failure leaves the source untouched.
pub fn move_into(source: &Path, dest_dir: &Path) -> Result<PathBuf, WatchError> {
    fs::create_dir_all(dest_dir).map_err(|e| io_failure(source, e))?;

    let file_name = source.file_name().ok_or_else(|| {
        io_failure(
            source,
            io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"),
        )
    })?;

    let destination =
        claim_name(dest_dir, Path::new(file_name)).map_err(|e| io_failure(source, e))?;

    if let Err(e) = fs::rename(source, &destination) {
        // Release the placeholder so the name stays usable.
        let _ = fs::remove_file(&destination);
        return Err(io_failure(source, e));
    }

    Ok(destination)
}

/// Reserve the first unused destination for `file_name` inside `dir`.
///
/// The name is claimed atomically with `create_new`, so two relocations
/// racing toward the same target cannot both pick it; `rename` would
/// silently replace the loser's file otherwise. The caller renames over
/// the placeholder, or removes it when the move fails.
fn claim_name(dir: &Path, file_name: &Path) -> io::Result<PathBuf> {
    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = file_name.extension().map(|e| e.to_string_lossy().into_owned());

    let mut n: u32 = 0;
    loop {
        let candidate = if n == 0 {
            dir.join(file_name)
        } else {
            match &extension {
                Some(ext) => dir.join(format!("{stem}_{n}.{ext}")),
                None => dir.join(format!("{stem}_{n}")),
            }
        };

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(_) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e),
        }
    }
}
