use std::borrow::Cow;
use std::collections::BTreeMap;
use std::convert::TryInto;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::{self, FromStr};

use fnv::FnvHashMap;
use itertools::Itertools;
use log::warn;
use simple_error::SimpleError;

use crate::error::{Result, TokfreakError};

pub type VocabMap = FnvHashMap<Box<[u8]>, u32>;

/// The counted words. Position in the list is the output column.
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
    words: Vec<Box<[u8]>>,
    index: VocabMap,
}

pub(crate) fn trim_ascii(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if first.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    while let [rest @ .., last] = bytes {
        if last.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    bytes
}

impl Vocabulary {
    /// Words are trimmed; blank entries are dropped and repeats are an error.
    pub fn from_words<I, W>(words: I) -> Result<Vocabulary>
    where
        I: IntoIterator<Item = W>,
        W: AsRef<[u8]>,
    {
        let mut vocab = Vocabulary::default();
        for word in words {
            let word = trim_ascii(word.as_ref());
            if word.is_empty() {
                continue;
            }
            if vocab.index.contains_key(word) {
                return Err(TokfreakError::InvalidVocabulary(format!(
                    "{:?} appears more than once",
                    String::from_utf8_lossy(word)
                )));
            }
            let col: u32 = vocab.words.len().try_into().map_err(|_| {
                TokfreakError::InvalidVocabulary("more than u32::MAX words".into())
            })?;
            let boxed: Box<[u8]> = word.into();
            vocab.index.insert(boxed.clone(), col);
            vocab.words.push(boxed);
        }
        Ok(vocab)
    }

    /// Parses a vocabulary file: words separated by commas or newlines. A
    /// first line holding only a number declares how many words follow.
    pub fn parse(contents: &[u8]) -> Result<Vocabulary> {
        let (declared, body) = split_count_header(contents);
        let vocab = Vocabulary::from_words(body.split(|b| *b == b',' || *b == b'\n'))?;
        if let Some(declared) = declared {
            if declared != vocab.len() {
                return Err(TokfreakError::InvalidVocabulary(format!(
                    "header declares {} words but {} were found",
                    declared,
                    vocab.len()
                )));
            }
        }
        if vocab.is_empty() {
            warn!("Vocabulary is empty; every count will be zero");
        }
        Ok(vocab)
    }

    pub fn load(path: &Path) -> Result<Vocabulary> {
        let contents = fs::read(path).map_err(|err| TokfreakError::io(err, Some(path.to_owned())))?;
        Vocabulary::parse(&contents)
    }

    pub fn get(&self, word: &[u8]) -> Option<u32> {
        self.index.get(word).copied()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[Box<[u8]>] {
        &self.words
    }

    pub fn word_str(&self, col: usize) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.words[col])
    }

    pub fn write<W: Write>(&self, mut out: W, with_count_header: bool) -> std::io::Result<()> {
        if with_count_header {
            writeln!(out, "{}", self.len())?;
        }
        for (idx, word) in self.words.iter().enumerate() {
            if idx > 0 {
                out.write_all(b",")?;
            }
            out.write_all(word)?;
        }
        out.write_all(b"\n")?;
        out.flush()
    }
}

fn split_count_header(contents: &[u8]) -> (Option<usize>, &[u8]) {
    let newline = match contents.iter().position(|b| *b == b'\n') {
        Some(pos) => pos,
        None => return (None, contents),
    };
    let first = trim_ascii(&contents[..newline]);
    let rest = &contents[newline + 1..];
    if first.is_empty() || !first.iter().all(u8::is_ascii_digit) || trim_ascii(rest).is_empty() {
        return (None, contents);
    }
    match str::from_utf8(first).ok().and_then(|s| s.parse().ok()) {
        Some(count) => (Some(count), rest),
        None => (None, contents),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VocabOrder {
    Alphabetical,
    Frequency,
}

impl FromStr for VocabOrder {
    type Err = SimpleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s == "alphabetical" {
            Ok(VocabOrder::Alphabetical)
        } else if s == "frequency" {
            Ok(VocabOrder::Frequency)
        } else {
            Err(SimpleError::new("Must be alphabetical or frequency"))
        }
    }
}

/// Accumulates corpus-wide token counts to derive a vocabulary.
// XXX: Reduce allocations using SmartString/SmallVec
#[derive(Clone, Debug, Default)]
pub struct VocabBuilder {
    pub acc: BTreeMap<Box<[u8]>, u64>,
}

impl VocabBuilder {
    pub fn new() -> VocabBuilder {
        VocabBuilder { acc: BTreeMap::new() }
    }

    fn inc_key_ref(&mut self, key: &[u8], inc: u64) {
        if let Some(cnt) = self.acc.get_mut(key) {
            *cnt += inc;
        } else {
            self.acc.insert(key.into(), inc);
        }
    }

    fn inc_key_owned(&mut self, key: Box<[u8]>, inc: u64) {
        *self.acc.entry(key).or_insert(0) += inc;
    }

    pub fn add(&mut self, elem: &[u8]) {
        self.inc_key_ref(elem, 1);
    }

    pub fn merge(&mut self, other: VocabBuilder) {
        for (elem, cnt) in other.acc.into_iter() {
            self.inc_key_owned(elem, cnt);
        }
    }

    /// Merges the smaller builder into the larger one.
    pub fn merged(self, other: VocabBuilder) -> VocabBuilder {
        let (mut acc, rest) = if self.acc.len() < other.acc.len() {
            (other, self)
        } else {
            (self, other)
        };
        acc.merge(rest);
        acc
    }

    pub fn len(&self) -> usize {
        self.acc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acc.is_empty()
    }

    /// Keeps words seen at least `min_count` times. Returns the vocabulary and
    /// the corpus count of each of its words, in column order.
    pub fn build(self, min_count: u64, order: VocabOrder) -> Result<(Vocabulary, Vec<u64>)> {
        let mut word_freqs = self.acc
            .into_iter()
            .filter(|(_, cnt)| *cnt >= min_count)
            .collect_vec();
        if order == VocabOrder::Frequency {
            word_freqs.sort_unstable_by(|(word_a, freq_a), (word_b, freq_b)| {
                freq_b.cmp(freq_a).then_with(|| word_a.cmp(word_b))
            });
        }
        let (words, counts): (Vec<_>, Vec<_>) = word_freqs.into_iter().unzip();
        Ok((Vocabulary::from_words(words)?, counts))
    }
}
