use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use atomic_write_file::AtomicWriteFile;

use super::{
    BoxFileRead, BoxFileWrite, FileWrite, FilesIoError, ReadWriter, Reader, check_fully_relative,
};

/// Reads and writes files under a directory. Writes are atomic: a file only
/// appears once committed.
#[derive(Debug)]
pub struct DirReadWriter {
    dir_path: PathBuf,
}

impl DirReadWriter {
    pub fn new<P>(dir_path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            dir_path: dir_path.into(),
        }
    }
}

impl Reader for DirReadWriter {
    fn open_read(&self, path: &Path) -> Result<BoxFileRead> {
        check_fully_relative(path)?;
        let full_path = self.dir_path.join(path);

        match File::open(&full_path) {
            Ok(f) => Ok(Box::new(f)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(anyhow!(FilesIoError::NotFound))
            }
            Err(e) => Err(anyhow!(e)).with_context(|| format!("opening {:?}", full_path)),
        }
    }

    fn iter_files(&self) -> Box<dyn Iterator<Item = Result<PathBuf>> + '_> {
        let dir_path = self.dir_path.as_path();
        Box::new(
            walkdir::WalkDir::new(dir_path)
                .follow_links(false)
                .same_file_system(true)
                .into_iter()
                .filter_map(move |dir_entry| match dir_entry {
                    Err(e) => match e.io_error() {
                        // NotFound for dir_path implies no entries at all,
                        // which is not an error, just an empty reader.
                        Some(io_err)
                            if io_err.kind() == std::io::ErrorKind::NotFound
                                && e.path() == Some(dir_path) =>
                        {
                            None
                        }
                        // Pass other errors through.
                        _ => Some(Err(anyhow!(e))),
                    },
                    Ok(dir_entry) if dir_entry.file_type().is_file() => {
                        match dir_entry.path().strip_prefix(dir_path) {
                            Err(e) => Some(Err(anyhow!(e))),
                            Ok(rel_path) => Some(Ok(rel_path.to_owned())),
                        }
                    }
                    _ => None,
                }),
        )
    }

    fn exists(&self, path: &Path) -> bool {
        check_fully_relative(path).is_ok() && self.dir_path.join(path).exists()
    }
}

impl ReadWriter for DirReadWriter {
    fn open_write(&self, path: &Path) -> Result<BoxFileWrite> {
        check_fully_relative(path)?;
        let full_path = self.dir_path.join(path);

        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {:?}", parent))?;
        }

        let f = AtomicWriteFile::open(&full_path)
            .with_context(|| format!("opening {:?} for writing", full_path))?;
        Ok(Box::new(DirFileWrite { f }))
    }
}

#[derive(Debug)]
struct DirFileWrite {
    f: AtomicWriteFile,
}

impl FileWrite for DirFileWrite {
    fn commit(self: Box<Self>) -> Result<()> {
        self.f.commit().with_context(|| "committing file")
    }

    fn discard(self: Box<Self>) -> Result<()> {
        self.f.discard().with_context(|| "discarding file")
    }
}

impl Write for DirFileWrite {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.f.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.f.flush()
    }
}
