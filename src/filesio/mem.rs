use std::{
    collections::HashMap,
    fmt::Debug,
    io::{Cursor, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{Result, anyhow};

use super::{
    BoxFileRead, BoxFileWrite, FileWrite, FilesIoError, ReadWriter, Reader, check_fully_relative,
};

type FileMap = HashMap<PathBuf, Arc<[u8]>>;

/// Shared handle to in-memory file contents. Clones refer to the same files.
#[derive(Clone, Default)]
pub struct MemFilesHandle {
    file_map: Arc<Mutex<FileMap>>,
}

impl MemFilesHandle {
    fn lock(&self) -> MutexGuard<'_, FileMap> {
        match self.file_map.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Returns a copy of all files and their contents.
    pub fn snapshot(&self) -> HashMap<PathBuf, Vec<u8>> {
        self.lock()
            .iter()
            .map(|(path, contents)| (path.clone(), contents.to_vec()))
            .collect()
    }
}

pub struct MemReadWriter {
    files: MemFilesHandle,
}

impl MemReadWriter {
    pub fn new(files: MemFilesHandle) -> Self {
        Self { files }
    }
}

impl Reader for MemReadWriter {
    fn open_read(&self, path: &Path) -> Result<BoxFileRead> {
        check_fully_relative(path)?;
        match self.files.lock().get(path) {
            None => Err(anyhow!(FilesIoError::NotFound)),
            Some(buf) => Ok(Box::new(Cursor::new(buf.clone()))),
        }
    }

    fn iter_files(&self) -> Box<dyn Iterator<Item = Result<PathBuf>> + '_> {
        let paths: Vec<_> = self.files.lock().keys().cloned().map(Ok).collect();
        Box::new(paths.into_iter())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }
}

impl ReadWriter for MemReadWriter {
    fn open_write(&self, path: &Path) -> Result<BoxFileWrite> {
        check_fully_relative(path)?;
        Ok(Box::new(MemFileWrite {
            files: self.files.clone(),
            path: path.to_owned(),
            buf: Vec::new(),
        }))
    }
}

struct MemFileWrite {
    files: MemFilesHandle,
    path: PathBuf,
    buf: Vec<u8>,
}

impl Debug for MemFileWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemFileWrite")
            .field("path", &self.path)
            .finish()
    }
}

impl FileWrite for MemFileWrite {
    fn commit(self: Box<Self>) -> Result<()> {
        let Self { files, path, buf } = *self;
        files.lock().insert(path, buf.into());
        Ok(())
    }

    fn discard(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

impl Write for MemFileWrite {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
