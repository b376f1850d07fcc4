mod dir;
#[cfg(test)]
mod mem;

use std::{
    error::Error,
    fmt::{Debug, Display},
    io::{Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};

pub use dir::DirReadWriter;
#[cfg(test)]
pub use mem::{MemFilesHandle, MemReadWriter};

pub type BoxFileRead = Box<dyn Read + Send>;
pub type BoxFileWrite = Box<dyn FileWrite>;

/// A file being written. Its contents only become visible to readers once
/// committed.
pub trait FileWrite: Debug + Write + Send {
    fn commit(self: Box<Self>) -> Result<()>;
    fn discard(self: Box<Self>) -> Result<()>;
}

/// Concrete error type returned by `Reader`/`ReadWriter` implementations for
/// cases that might reasonably be handled by callers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilesIoError {
    NonLinearRelativePath(NonRelativePathType),
    NotFound,
}

impl Display for FilesIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use FilesIoError::*;
        match self {
            NonLinearRelativePath(t) => write!(
                f,
                "path is not a linear relative path because it contains a {} component",
                t
            ),
            NotFound => write!(f, "file not found"),
        }
    }
}

impl FilesIoError {
    /// Returns true if `err` is this error.
    pub fn eq_anyhow(&self, err: &anyhow::Error) -> bool {
        err.downcast_ref::<Self>() == Some(self)
    }
}

impl Error for FilesIoError {}

/// Type of path `Component` causing a path to be non-relative.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NonRelativePathType {
    CurDir,
    ParentDir,
    Prefix,
    RootDir,
}

impl Display for NonRelativePathType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use NonRelativePathType::*;
        match self {
            CurDir => write!(f, "current directory"),
            ParentDir => write!(f, "parent directory"),
            Prefix => write!(f, "prefix"),
            RootDir => write!(f, "root directory"),
        }
    }
}

/// Protocol for reading files from the collection.
pub trait Reader: Send + Sync {
    /// Open a file for reading. `path` is the path of the file to read.
    fn open_read(&self, path: &Path) -> Result<BoxFileRead>;

    /// Iterates over all files that the reader has. The order is undefined.
    fn iter_files(&self) -> Box<dyn Iterator<Item = Result<PathBuf>> + '_>;

    /// Return `true` if the file exists.
    fn exists(&self, path: &Path) -> bool;

    /// Reads the entire UTF-8 contents of the file at `path`.
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let mut f = self.open_read(path)?;
        let mut contents = String::new();
        f.read_to_string(&mut contents)
            .with_context(|| format!("reading {:?}", path))?;
        Ok(contents)
    }
}

/// Protocol for reading and writing files in the collection.
pub trait ReadWriter: Reader {
    /// Open a file for writing. `path` is the path of the file to write.
    fn open_write(&self, path: &Path) -> Result<BoxFileWrite>;
}

/// Returns an error if `path` is not a strictly linear relative path. That
/// is, it has only normal components.
fn check_fully_relative(path: &Path) -> Result<()> {
    use std::path::Component::*;
    for component in path.components() {
        let non_relative_type = match component {
            Normal(_) => continue,
            CurDir => NonRelativePathType::CurDir,
            ParentDir => NonRelativePathType::ParentDir,
            Prefix(_) => NonRelativePathType::Prefix,
            RootDir => NonRelativePathType::RootDir,
        };
        return Err(anyhow!(FilesIoError::NonLinearRelativePath(
            non_relative_type
        )));
    }
    Ok(())
}
