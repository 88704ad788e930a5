//! Counting vocabulary hits inside one worker's byte range.

use std::io::{BufRead, Read};

use log::{debug, trace};

use crate::boundary::locate_start;
use crate::corpus::CorpusIndex;
use crate::error::{Result, TokfreakError};
use crate::run::AbortSignal;
use crate::store::DocumentStore;
use crate::table::FrequencyTable;
use crate::types::{ByteRange, DocIdx, ScanOptions};
use crate::vocab::{trim_ascii, Vocabulary};

/// One token as it sits in the document.
#[derive(Debug)]
pub struct Token<'a> {
    /// Document-local offset of the token's first byte.
    pub offset: u64,
    /// Bytes consumed, including the trailing delimiter if there was one.
    pub consumed: u64,
    /// Token text without delimiter or surrounding ASCII whitespace.
    pub text: &'a [u8],
}

/// Splits a document stream into delimiter-terminated tokens. A document end
/// also ends a token, so the final delimiter is optional.
pub struct TokenReader<'t, R> {
    reader: R,
    title: &'t str,
    buf: Vec<u8>,
    position: u64,
    options: ScanOptions,
}

impl<'t, R: BufRead> TokenReader<'t, R> {
    /// `position` is where `reader` currently stands in the document.
    pub fn new(reader: R, title: &'t str, position: u64, options: ScanOptions) -> TokenReader<'t, R> {
        TokenReader {
            reader,
            title,
            buf: Vec::with_capacity(64),
            position,
            options,
        }
    }

    pub fn next_token(&mut self) -> Result<Option<Token<'_>>> {
        self.buf.clear();
        let limit = self.options.max_token_len as u64 + 1;
        let delimiter = self.options.delimiter;
        let read = (&mut self.reader)
            .take(limit)
            .read_until(delimiter, &mut self.buf)
            .map_err(|err| TokfreakError::io(err, Some(self.title.into())))?;
        if read == 0 {
            return Ok(None);
        }
        let terminated = self.buf.last() == Some(&delimiter);
        if !terminated && read as u64 == limit {
            return Err(TokfreakError::TokenTooLong {
                document: self.title.to_owned(),
                offset: self.position,
                limit: self.options.max_token_len,
            });
        }
        let offset = self.position;
        self.position += read as u64;
        let raw = if terminated { &self.buf[..read - 1] } else { &self.buf[..] };
        Ok(Some(Token { offset, consumed: read as u64, text: trim_ascii(raw) }))
    }

    /// Calls `proc_token` for every remaining token.
    pub fn for_each_token<F: FnMut(&[u8])>(&mut self, mut proc_token: F) -> Result<()> {
        while let Some(token) = self.next_token()? {
            proc_token(token.text);
        }
        Ok(())
    }
}

/// Per-worker scan state. `consumed` is the global offset of the next unread
/// byte; `offset` is the same point inside `document`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerCursor {
    pub document: DocIdx,
    pub consumed: u64,
    pub offset: u64,
}

impl WorkerCursor {
    pub fn at(index: &CorpusIndex, global_offset: u64) -> Result<WorkerCursor> {
        let pos = index.locate(global_offset)?;
        Ok(WorkerCursor { document: pos.document, consumed: global_offset, offset: pos.offset })
    }

    fn skip_to(&mut self, offset: u64) {
        self.consumed += offset - self.offset;
        self.offset = offset;
    }

    fn advance(&mut self, bytes: u64) {
        self.consumed += bytes;
        self.offset += bytes;
    }

    fn next_document(&mut self, index: &CorpusIndex) {
        self.document += 1;
        self.offset = 0;
        self.consumed = match index.document(self.document) {
            Some(doc) => doc.offset,
            None => index.total_size(),
        };
    }
}

/// Counts the tokens whose first byte lies in `range`.
///
/// The start is aligned with [`locate_start`] before the first token is read
/// and again on entry to every following document, where it is a no-op since
/// documents begin on a token boundary. The scan stops at the first token
/// starting at or after `range.end`, or at the end of the corpus.
pub fn count_range<S>(
    index: &CorpusIndex,
    store: &S,
    vocab: &Vocabulary,
    range: ByteRange,
    options: ScanOptions,
    abort: &AbortSignal,
) -> Result<FrequencyTable>
where
    S: DocumentStore + ?Sized,
{
    let mut table = FrequencyTable::new(index.len(), vocab.len());
    if range.is_empty() {
        debug!("Range {} is empty, nothing to count", range);
        return Ok(table);
    }

    let mut cursor = WorkerCursor::at(index, range.start)?;
    let mut tokens_read = 0u64;
    while cursor.consumed < range.end && cursor.document < index.len() {
        abort.check()?;
        let doc = &index.documents()[cursor.document];
        if doc.len == 0 {
            cursor.next_document(index);
            continue;
        }
        let mut reader = store.open(&doc.title)?;
        let aligned = locate_start(&mut reader, &doc.title, cursor.offset, options)?;
        if aligned != cursor.offset {
            trace!("{}: realigned {} -> {}", doc.title, cursor.offset, aligned);
        }
        cursor.skip_to(aligned);

        let mut tokens = TokenReader::new(reader, &doc.title, aligned, options);
        while range.contains(cursor.consumed) {
            let token = match tokens.next_token()? {
                Some(token) => token,
                None => break,
            };
            cursor.advance(token.consumed);
            tokens_read += 1;
            if let Some(col) = vocab.get(token.text) {
                table.increment(cursor.document, col as usize);
            }
            if tokens_read % 4096 == 0 {
                abort.check()?;
            }
        }
        if cursor.consumed < range.end {
            cursor.next_document(index);
        }
    }
    debug!("Range {} ({} bytes): {} tokens, {} hits", range, range.len(), tokens_read, table.total());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use std::io::Cursor;

    const OPTS: ScanOptions = ScanOptions { delimiter: b',', max_token_len: 32 };

    fn tokens_of(doc: &[u8]) -> Vec<(u64, u64, String)> {
        let mut reader = TokenReader::new(Cursor::new(doc), "doc", 0, OPTS);
        let mut out = Vec::new();
        while let Some(tok) = reader.next_token().unwrap() {
            out.push((tok.offset, tok.consumed, String::from_utf8(tok.text.to_vec()).unwrap()));
        }
        out
    }

    #[test]
    fn tokens_carry_offsets_and_sizes() {
        assert_eq!(
            tokens_of(b"a, bb,,c\n"),
            vec![
                (0, 2, "a".to_owned()),
                (2, 4, "bb".to_owned()),
                (6, 1, "".to_owned()),
                (7, 2, "c".to_owned()),
            ]
        );
    }

    #[test]
    fn token_limit_is_enforced() {
        let doc = vec![b'q'; 40];
        let mut reader = TokenReader::new(Cursor::new(&doc[..]), "doc", 0, OPTS);
        assert!(matches!(reader.next_token(), Err(TokfreakError::TokenTooLong { offset: 0, limit: 32, .. })));
    }

    fn scenario() -> (CorpusIndex, InMemoryStore, Vocabulary) {
        let store: InMemoryStore = vec![("doc0", "a,x,b,a,"), ("doc1", "b,b,")].into_iter().collect();
        let index = CorpusIndex::build(&["doc0", "doc1"], &store).unwrap();
        let vocab = Vocabulary::from_words(vec!["a", "b"]).unwrap();
        (index, store, vocab)
    }

    fn count(range: ByteRange) -> FrequencyTable {
        let (index, store, vocab) = scenario();
        count_range(&index, &store, &vocab, range, OPTS, &AbortSignal::default()).unwrap()
    }

    #[test]
    fn two_worker_scenario() {
        let first = count(ByteRange::new(0, 6));
        assert_eq!(first, FrequencyTable::from_rows(vec![vec![1, 1], vec![0, 0]]).unwrap());
        let second = count(ByteRange::new(6, 12));
        assert_eq!(second, FrequencyTable::from_rows(vec![vec![1, 0], vec![0, 2]]).unwrap());
    }

    #[test]
    fn token_straddling_the_end_belongs_to_the_earlier_range() {
        // Byte 5 is the comma after "b"; byte 4 starts "b".
        assert_eq!(count(ByteRange::new(0, 5)).row(0), &[1, 1]);
        assert_eq!(count(ByteRange::new(5, 12)).row(0), &[1, 0]);
        // Byte 3 is the tail of "x,", so the range starts at "b".
        assert_eq!(count(ByteRange::new(3, 5)).row(0), &[0, 1]);
    }

    #[test]
    fn range_crossing_into_next_document() {
        let table = count(ByteRange::new(7, 10));
        assert_eq!(table, FrequencyTable::from_rows(vec![vec![0, 0], vec![0, 1]]).unwrap());
    }

    #[test]
    fn empty_range_is_all_zero() {
        let table = count(ByteRange::empty_at(12));
        assert!(table.is_zero());
        assert_eq!((table.rows(), table.cols()), (2, 2));
    }

    #[test]
    fn raised_abort_stops_the_worker() {
        let (index, store, vocab) = scenario();
        let abort = AbortSignal::default();
        abort.raise();
        let res = count_range(&index, &store, &vocab, ByteRange::new(0, 12), OPTS, &abort);
        assert!(matches!(res, Err(TokfreakError::Aborted)));
    }
}
