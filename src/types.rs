use std::fmt;

pub type WorkerId = usize;
pub type DocIdx = usize;

/// Half-open interval `[start, end)` over the concatenation of every
/// document in corpus order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> ByteRange {
        debug_assert!(start <= end);
        ByteRange { start, end }
    }

    pub fn empty_at(offset: u64) -> ByteRange {
        ByteRange { start: offset, end: offset }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, offset: u64) -> bool {
        self.start <= offset && offset < self.end
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A global offset resolved to a document and an offset inside it.
/// `document == number of documents` is the end-of-corpus sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub document: DocIdx,
    pub offset: u64,
}

/// Delimiter and token limit shared by the boundary scan and the counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanOptions {
    pub delimiter: u8,
    pub max_token_len: usize,
}
