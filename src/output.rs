use std::{
    io,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    #[error("no permission to create directory {}", .path.display())]
    PermissionDenied { path: PathBuf },
    #[error("could not create directory {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl OutputError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::PermissionDenied => OutputError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => OutputError::Filesystem {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Creates `path` and any missing parents, returning the absolute directory.
/// Safe to call on a directory that already exists.
pub async fn prepare(path: &Path) -> Result<PathBuf, OutputError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| OutputError::from_io(path, e))?;

    let resolved = tokio::fs::canonicalize(path)
        .await
        .map_err(|e| OutputError::from_io(path, e))?;

    debug!("Output directory ready: {}", resolved.display());
    Ok(resolved)
}
