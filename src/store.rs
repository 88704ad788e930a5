//! Where documents live. A store answers two questions: how many bytes a
//! document has, and a seekable buffered reader over those bytes.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap::Mmap;

use crate::error::{Result, TokfreakError};

const READ_CHUNK_SIZE: usize = 64 * 1024;

pub trait BufReadSeek: BufRead + Seek {}

impl<T: BufRead + Seek> BufReadSeek for T {}

pub type DocReader<'a> = Box<dyn BufReadSeek + Send + 'a>;

/// Read-only access to the corpus. Implementations must be shareable across
/// worker threads; every worker opens its own readers.
pub trait DocumentStore: Sync {
    fn doc_len(&self, title: &str) -> Result<u64>;
    fn open(&self, title: &str) -> Result<DocReader<'_>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backing {
    Mmap,
    Buffered,
}

/// Documents stored as `<dir>/<title>.<extension>`.
#[derive(Clone, Debug)]
pub struct FsStore {
    dir: PathBuf,
    extension: Option<String>,
    backing: Backing,
}

impl FsStore {
    pub fn new(dir: impl Into<PathBuf>, extension: Option<String>) -> FsStore {
        FsStore {
            dir: dir.into(),
            extension: extension.filter(|ext| !ext.is_empty()),
            backing: Backing::Mmap,
        }
    }

    pub fn with_backing(mut self, backing: Backing) -> FsStore {
        self.backing = backing;
        self
    }

    pub fn path_for(&self, title: &str) -> PathBuf {
        match &self.extension {
            Some(ext) => self.dir.join(format!("{}.{}", title, ext)),
            None => self.dir.join(title),
        }
    }

    fn open_file(&self, title: &str) -> Result<(File, PathBuf)> {
        let path = self.path_for(title);
        match File::open(&path) {
            Ok(file) => Ok((file, path)),
            Err(err) => Err(not_found_or_io(err, title, path)),
        }
    }
}

fn not_found_or_io(err: io::Error, title: &str, path: PathBuf) -> TokfreakError {
    if err.kind() == io::ErrorKind::NotFound {
        TokfreakError::DocumentNotFound { title: title.to_owned(), path }
    } else {
        TokfreakError::io(err, Some(path))
    }
}

pub(crate) fn mmap_file(file: &File, path: &Path) -> Result<Mmap> {
    // SAFETY: corpus files are opened read-only and are never written while a
    // run is in progress.
    unsafe { Mmap::map(file) }.map_err(|err| TokfreakError::io(err, Some(path.to_owned())))
}

impl DocumentStore for FsStore {
    fn doc_len(&self, title: &str) -> Result<u64> {
        let path = self.path_for(title);
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(meta.len()),
            Ok(_) => Err(TokfreakError::DocumentNotFound { title: title.to_owned(), path }),
            Err(err) => Err(not_found_or_io(err, title, path)),
        }
    }

    fn open(&self, title: &str) -> Result<DocReader<'_>> {
        let (file, path) = self.open_file(title)?;
        let len = file
            .metadata()
            .map_err(|err| TokfreakError::io(err, Some(path.clone())))?
            .len();
        // Zero-length files cannot be mapped.
        if len == 0 {
            return Ok(Box::new(Cursor::new(Vec::new())));
        }
        match self.backing {
            Backing::Mmap => Ok(Box::new(Cursor::new(mmap_file(&file, &path)?))),
            Backing::Buffered => Ok(Box::new(BufReader::with_capacity(READ_CHUNK_SIZE, file))),
        }
    }
}

/// Corpus held in memory, keyed by title.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    docs: BTreeMap<String, Arc<[u8]>>,
}

impl InMemoryStore {
    pub fn new() -> InMemoryStore {
        InMemoryStore::default()
    }

    pub fn insert(&mut self, title: impl Into<String>, contents: impl AsRef<[u8]>) {
        self.docs.insert(title.into(), Arc::from(contents.as_ref()));
    }

    fn get(&self, title: &str) -> Result<&Arc<[u8]>> {
        self.docs.get(title).ok_or_else(|| TokfreakError::DocumentNotFound {
            title: title.to_owned(),
            path: PathBuf::from(title),
        })
    }
}

impl<T: Into<String>, C: AsRef<[u8]>> std::iter::FromIterator<(T, C)> for InMemoryStore {
    fn from_iter<I: IntoIterator<Item = (T, C)>>(iter: I) -> Self {
        let mut store = InMemoryStore::new();
        for (title, contents) in iter {
            store.insert(title, contents);
        }
        store
    }
}

impl DocumentStore for InMemoryStore {
    fn doc_len(&self, title: &str) -> Result<u64> {
        Ok(self.get(title)?.len() as u64)
    }

    fn open(&self, title: &str) -> Result<DocReader<'_>> {
        Ok(Box::new(Cursor::new(Arc::clone(self.get(title)?))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn fs_store_reads_through_both_backings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hamlet.txt"), b"to,be,or,not,").unwrap();
        std::fs::write(dir.path().join("empty.txt"), b"").unwrap();

        for backing in [Backing::Mmap, Backing::Buffered].iter() {
            let store = FsStore::new(dir.path(), Some("txt".to_owned())).with_backing(*backing);
            assert_eq!(store.doc_len("hamlet").unwrap(), 13);
            let mut contents = Vec::new();
            store.open("hamlet").unwrap().read_to_end(&mut contents).unwrap();
            assert_eq!(contents, b"to,be,or,not,");

            assert_eq!(store.doc_len("empty").unwrap(), 0);
            let mut contents = Vec::new();
            store.open("empty").unwrap().read_to_end(&mut contents).unwrap();
            assert!(contents.is_empty());
        }
    }

    #[test]
    fn missing_document_is_reported_by_title() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path(), Some("txt".to_owned()));
        match store.doc_len("macbeth") {
            Err(TokfreakError::DocumentNotFound { title, path }) => {
                assert_eq!(title, "macbeth");
                assert_eq!(path, dir.path().join("macbeth.txt"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(store.open("macbeth"), Err(TokfreakError::DocumentNotFound { .. })));
    }

    #[test]
    fn in_memory_store_from_pairs() {
        let store: InMemoryStore = vec![("a", "x,y,"), ("b", "")].into_iter().collect();
        assert_eq!(store.doc_len("a").unwrap(), 4);
        assert_eq!(store.doc_len("b").unwrap(), 0);
        assert!(store.doc_len("c").is_err());
    }
}
