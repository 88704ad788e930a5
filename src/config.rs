//! Run configuration and its validation.

use crate::error::{Result, TokfreakError};
use crate::types::ScanOptions;

pub const DEFAULT_DELIMITER: u8 = b',';
/// Longest token accepted before a document is considered corrupt.
pub const DEFAULT_MAX_TOKEN_LEN: usize = 1 << 20;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    /// Fixed number of workers for the whole run.
    pub workers: usize,
    /// Require exactly one worker per document.
    pub one_worker_per_document: bool,
    pub delimiter: u8,
    pub max_token_len: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            workers: 1,
            one_worker_per_document: false,
            delimiter: DEFAULT_DELIMITER,
            max_token_len: DEFAULT_MAX_TOKEN_LEN,
        }
    }
}

impl RunConfig {
    pub fn new(workers: usize) -> RunConfig {
        RunConfig { workers, ..RunConfig::default() }
    }

    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions { delimiter: self.delimiter, max_token_len: self.max_token_len }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(TokfreakError::InvalidConfig("worker count must be greater than zero".into()));
        }
        if self.max_token_len == 0 {
            return Err(TokfreakError::InvalidConfig("max_token_len must be greater than zero".into()));
        }
        if self.delimiter.is_ascii_whitespace() {
            return Err(TokfreakError::InvalidConfig(
                "the delimiter cannot be whitespace, tokens are whitespace-trimmed".into(),
            ));
        }
        Ok(())
    }

    /// Checks the worker count against the number of documents.
    pub fn validate_for_corpus(&self, documents: usize) -> Result<()> {
        self.validate()?;
        if documents == 0 {
            return Err(TokfreakError::InvalidConfig("at least one document is required".into()));
        }
        if self.one_worker_per_document && self.workers != documents {
            return Err(TokfreakError::InvalidConfig(format!(
                "{} workers for {} documents, one worker per document is required",
                self.workers, documents
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn one_worker_per_document(mut self, strict: bool) -> Self {
        self.config.one_worker_per_document = strict;
        self
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.config.delimiter = delimiter;
        self
    }

    pub fn max_token_len(mut self, max_token_len: usize) -> Self {
        self.config.max_token_len = max_token_len;
        self
    }

    pub fn build(self) -> Result<RunConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RunConfig::builder().workers(4).build().unwrap();
        assert_eq!(config.scan_options(), ScanOptions { delimiter: b',', max_token_len: 1 << 20 });
    }

    #[test]
    fn zero_workers_or_zero_token_len() {
        assert!(RunConfig::builder().workers(0).build().is_err());
        assert!(RunConfig::builder().max_token_len(0).build().is_err());
        assert!(RunConfig::builder().delimiter(b' ').build().is_err());
    }

    #[test]
    fn strict_mode_needs_matching_counts() {
        let config = RunConfig::builder().workers(6).one_worker_per_document(true).build().unwrap();
        assert!(config.validate_for_corpus(6).is_ok());
        assert!(matches!(config.validate_for_corpus(5), Err(TokfreakError::InvalidConfig(_))));
        // Without strict mode any count is fine.
        assert!(RunConfig::new(6).validate_for_corpus(2).is_ok());
    }

    #[test]
    fn empty_corpus_is_rejected() {
        assert!(RunConfig::new(1).validate_for_corpus(0).is_err());
    }
}
