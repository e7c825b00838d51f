//! A small inverted index over sentence documents.
//!
//! The [IndexStore], [IndexWriter] and [IndexReader] traits are what the rest of the crate consumes.
//! [Index] implements them, either purely in memory or backed by a directory with one snapshot file.
//!
//! There is at most one writer per index. Documents added by a writer become visible to readers
//! opened after [IndexWriter::commit], all at once. A reader keeps the snapshot it was opened on.

use crate::{
    types::{DocId, Sentence},
    Error,
};
use fs_err as fs;
use log::{debug, info};
use parking_lot::RwLock;
use std::{
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

pub mod query;
mod segment;

pub use query::{Field, Query, Term};
use segment::Segment;

const SNAPSHOT_FILENAME: &str = "index.bin";

/// Storage for sentence documents.
pub trait IndexStore {
    type Writer: IndexWriter;
    type Reader: IndexReader;

    /// Opens the single writer of this store.
    ///
    /// # Errors
    /// - If another writer is open.
    fn writer(&self) -> Result<Self::Writer, Error>;

    /// Opens a reader on the last committed state.
    fn reader(&self) -> Result<Self::Reader, Error>;
}

pub trait IndexWriter {
    /// The ID the next added document must have.
    fn next_doc_id(&self) -> DocId;

    /// Adds a document. It is not visible to readers until [IndexWriter::commit] is called.
    fn add_document(&mut self, sentence: Sentence) -> Result<(), Error>;

    /// Makes all added documents visible to readers opened afterwards.
    fn commit(&mut self) -> Result<(), Error>;

    /// Releases the writer. Uncommitted documents are discarded.
    fn close(self) -> Result<(), Error>
    where
        Self: Sized,
    {
        Ok(())
    }
}

pub trait IndexReader: Send + Sync {
    fn num_docs(&self) -> usize;

    /// The IDs of all documents matching the query, in ascending order.
    fn search(&self, query: &Query) -> Result<Vec<DocId>, Error>;

    fn fetch(&self, id: DocId) -> Result<Sentence, Error>;

    /// Releases the reader.
    fn close(self)
    where
        Self: Sized,
    {
    }
}

#[derive(Debug)]
struct Inner {
    committed: RwLock<Arc<Segment>>,
    has_writer: AtomicBool,
    directory: Option<PathBuf>,
}

/// An index of sentence documents. Cloning an index yields another handle to the same index.
#[derive(Debug, Clone)]
pub struct Index {
    inner: Arc<Inner>,
}

impl Index {
    fn new(segment: Segment, directory: Option<PathBuf>) -> Self {
        Index {
            inner: Arc::new(Inner {
                committed: RwLock::new(Arc::new(segment)),
                has_writer: AtomicBool::new(false),
                directory,
            }),
        }
    }

    /// Creates an empty index living in memory only.
    pub fn in_memory() -> Self {
        Index::new(Segment::default(), None)
    }

    /// Creates an empty index persisted in `directory`. An existing index there is overwritten on the first commit.
    pub fn create_in_dir<P: AsRef<Path>>(directory: P) -> Result<Self, Error> {
        let directory = directory.as_ref();
        fs::create_dir_all(directory).map_err(|err| unavailable(directory, err))?;

        Ok(Index::new(Segment::default(), Some(directory.to_path_buf())))
    }

    /// Opens an index previously committed to `directory`.
    ///
    /// # Errors
    /// - If there is no index in the directory or it can not be read.
    pub fn open_in_dir<P: AsRef<Path>>(directory: P) -> Result<Self, Error> {
        let directory = directory.as_ref();
        let path = directory.join(SNAPSHOT_FILENAME);

        let reader = BufReader::new(fs::File::open(&path).map_err(|err| unavailable(&path, err))?);
        let segment: Segment =
            bincode::deserialize_from(reader).map_err(|err| unavailable(&path, err))?;

        info!("opened index at {} with {} documents", directory.display(), segment.len());

        Ok(Index::new(segment, Some(directory.to_path_buf())))
    }

    /// Number of committed documents.
    pub fn num_docs(&self) -> usize {
        self.inner.committed.read().len()
    }
}

fn unavailable<E: std::fmt::Display>(path: &Path, err: E) -> Error {
    Error::IndexUnavailable(format!("{}: {}", path.display(), err))
}

impl IndexStore for Index {
    type Writer = Writer;
    type Reader = Reader;

    fn writer(&self) -> Result<Writer, Error> {
        if self.inner.has_writer.swap(true, Ordering::SeqCst) {
            return Err(Error::IndexUnavailable(
                "the index already has an open writer".into(),
            ));
        }

        Ok(Writer {
            working: Arc::clone(&self.inner.committed.read()),
            pending: 0,
            inner: Arc::clone(&self.inner),
        })
    }

    fn reader(&self) -> Result<Reader, Error> {
        Ok(Reader {
            snapshot: Arc::clone(&self.inner.committed.read()),
        })
    }
}

/// The writer of an [Index].
#[derive(Debug)]
pub struct Writer {
    inner: Arc<Inner>,
    // copy on write: only cloned if a reader still holds the committed snapshot
    working: Arc<Segment>,
    pending: usize,
}

impl Writer {
    fn persist(&self, directory: &Path) -> Result<(), Error> {
        let path = directory.join(SNAPSHOT_FILENAME);
        let tmp_path = directory.join(format!("{}.tmp", SNAPSHOT_FILENAME));

        let mut writer =
            BufWriter::new(fs::File::create(&tmp_path).map_err(|err| unavailable(&tmp_path, err))?);
        bincode::serialize_into(&mut writer, &*self.working)?;
        writer.flush()?;
        fs::rename(&tmp_path, &path).map_err(|err| unavailable(&path, err))?;

        Ok(())
    }
}

impl IndexWriter for Writer {
    fn next_doc_id(&self) -> DocId {
        self.working.next_doc_id()
    }

    fn add_document(&mut self, sentence: Sentence) -> Result<(), Error> {
        let expected = self.next_doc_id();
        if sentence.id() != expected {
            return Err(Error::InvalidDocument(format!(
                "expected document id {}, got {}",
                expected,
                sentence.id()
            )));
        }

        Arc::make_mut(&mut self.working).add(sentence);
        self.pending += 1;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), Error> {
        if let Some(directory) = &self.inner.directory {
            self.persist(directory)?;
        }

        *self.inner.committed.write() = Arc::clone(&self.working);
        debug!("committed {} documents", self.pending);
        self.pending = 0;

        Ok(())
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        if self.pending > 0 {
            debug!("discarding {} uncommitted documents", self.pending);
        }
        self.inner.has_writer.store(false, Ordering::SeqCst);
    }
}

/// A reader of an [Index] on a fixed snapshot.
#[derive(Debug, Clone)]
pub struct Reader {
    snapshot: Arc<Segment>,
}

impl IndexReader for Reader {
    fn num_docs(&self) -> usize {
        self.snapshot.len()
    }

    fn search(&self, query: &Query) -> Result<Vec<DocId>, Error> {
        Ok(query.evaluate(&self.snapshot))
    }

    fn fetch(&self, id: DocId) -> Result<Sentence, Error> {
        self.snapshot
            .get(id)
            .cloned()
            .ok_or_else(|| Error::InvalidDocument(format!("no document with id {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnnotatedSentence, Token};

    fn sentence(id: DocId, text: &str) -> Sentence {
        let tokens = text
            .split(' ')
            .enumerate()
            .map(|(i, word)| Token {
                text: word.to_string(),
                lemma: None,
                pos: None,
                position: i,
                has_space_before: i > 0,
                char_span: (0, 0),
            })
            .collect();

        Sentence::new(id, "en", AnnotatedSentence::new(text.to_string(), tokens))
    }

    #[test]
    fn commit_makes_documents_visible() -> Result<(), Error> {
        let index = Index::in_memory();
        let before = index.reader()?;

        let mut writer = index.writer()?;
        writer.add_document(sentence(0, "move back"))?;

        assert_eq!(index.reader()?.num_docs(), 0);
        writer.commit()?;
        writer.close()?;

        let after = index.reader()?;
        assert_eq!(after.num_docs(), 1);
        assert_eq!(after.fetch(0)?.text(), "move back");
        assert_eq!(after.search(&Query::term(Field::Surface, "back"))?, vec![0]);

        // readers keep their snapshot
        assert_eq!(before.num_docs(), 0);
        assert!(before.search(&Query::All)?.is_empty());

        Ok(())
    }

    #[test]
    fn only_one_writer_at_a_time() -> Result<(), Error> {
        let index = Index::in_memory();

        let writer = index.writer()?;
        assert!(matches!(index.writer(), Err(Error::IndexUnavailable(_))));

        drop(writer);
        assert!(index.writer().is_ok());

        Ok(())
    }

    #[test]
    fn uncommitted_documents_are_discarded() -> Result<(), Error> {
        let index = Index::in_memory();

        let mut writer = index.writer()?;
        writer.add_document(sentence(0, "move back"))?;
        drop(writer);

        assert_eq!(index.num_docs(), 0);
        assert_eq!(index.writer()?.next_doc_id(), 0);

        Ok(())
    }

    #[test]
    fn rejects_out_of_order_ids() -> Result<(), Error> {
        let index = Index::in_memory();
        let mut writer = index.writer()?;

        assert!(matches!(
            writer.add_document(sentence(3, "move back")),
            Err(Error::InvalidDocument(_))
        ));
        assert!(matches!(index.reader()?.fetch(0), Err(Error::InvalidDocument(_))));

        Ok(())
    }

    #[test]
    fn persists_to_directory() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;

        let index = Index::create_in_dir(dir.path())?;
        let mut writer = index.writer()?;
        writer.add_document(sentence(0, "move back"))?;
        writer.add_document(sentence(1, "eye lid"))?;
        writer.commit()?;
        writer.close()?;

        let reopened = Index::open_in_dir(dir.path())?;
        let reader = reopened.reader()?;
        assert_eq!(reader.num_docs(), 2);
        assert_eq!(reader.search(&Query::term(Field::SurfaceFolded, "lid"))?, vec![1]);
        assert_eq!(reopened.writer()?.next_doc_id(), 2);

        Ok(())
    }

    #[test]
    fn opening_missing_index_fails() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            Index::open_in_dir(dir.path().join("missing")),
            Err(Error::IndexUnavailable(_))
        ));
    }
}
