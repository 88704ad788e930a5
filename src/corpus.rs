//! The corpus as one logical byte stream: documents laid end to end in a
//! fixed order, addressed by global offset.

use log::debug;

use crate::error::{Result, TokfreakError};
use crate::store::DocumentStore;
use crate::types::{DocIdx, Position};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub len: u64,
    /// Sum of the lengths of every document before this one.
    pub offset: u64,
}

impl Document {
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }
}

/// Cumulative-offset table over the corpus.
///
/// Every worker builds its own copy from the shared title list. The result is
/// a pure function of the titles and the store, so all copies agree without
/// anything being distributed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorpusIndex {
    docs: Vec<Document>,
    total_size: u64,
}

impl CorpusIndex {
    pub fn build<S, T>(titles: &[T], store: &S) -> Result<CorpusIndex>
    where
        S: DocumentStore + ?Sized,
        T: AsRef<str>,
    {
        let mut docs = Vec::with_capacity(titles.len());
        let mut offset = 0u64;
        for title in titles {
            let title = title.as_ref();
            let len = store.doc_len(title)?;
            docs.push(Document { title: title.to_owned(), len, offset });
            offset += len;
        }
        debug!("Indexed {} documents, {} bytes", docs.len(), offset);
        Ok(CorpusIndex { docs, total_size: offset })
    }

    pub fn from_lengths<I, T>(docs: I) -> CorpusIndex
    where
        I: IntoIterator<Item = (T, u64)>,
        T: Into<String>,
    {
        let mut offset = 0u64;
        let docs = docs
            .into_iter()
            .map(|(title, len)| {
                let doc = Document { title: title.into(), len, offset };
                offset += len;
                doc
            })
            .collect();
        CorpusIndex { docs, total_size: offset }
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    pub fn document(&self, idx: DocIdx) -> Option<&Document> {
        self.docs.get(idx)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Resolves a global offset. Empty documents are skipped, so an offset on
    /// a document boundary lands on the first byte of the next non-empty
    /// document. `offset == total_size` yields the end sentinel.
    pub fn locate(&self, offset: u64) -> Result<Position> {
        if offset > self.total_size {
            return Err(TokfreakError::OffsetOutOfRange { offset, total: self.total_size });
        }
        if offset == self.total_size {
            return Ok(Position { document: self.docs.len(), offset: 0 });
        }
        let document = self.docs.partition_point(|doc| doc.end() <= offset);
        Ok(Position { document, offset: offset - self.docs[document].offset })
    }
}
