//! Worker pool, reduction, and the single-pass reference scan.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::bounded;
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::RunConfig;
use crate::corpus::CorpusIndex;
use crate::counter::{count_range, TokenReader};
use crate::error::{Result, TokfreakError};
use crate::parallel::assign_range;
use crate::store::DocumentStore;
use crate::table::FrequencyTable;
use crate::types::{ScanOptions, WorkerId};
use crate::vocab::{VocabBuilder, Vocabulary};

/// Shared flag that makes every worker stop once one of them has failed.
#[derive(Clone, Debug, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_raised() {
            Err(TokfreakError::Aborted)
        } else {
            Ok(())
        }
    }
}

struct RaiseOnPanic<'a>(&'a AbortSignal);

impl Drop for RaiseOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.raise();
        }
    }
}

/// Everything one worker does: index the corpus, find its range, count.
pub fn run_worker<S, T>(
    worker_id: WorkerId,
    config: &RunConfig,
    titles: &[T],
    store: &S,
    vocab: &Vocabulary,
    abort: &AbortSignal,
) -> Result<FrequencyTable>
where
    S: DocumentStore + ?Sized,
    T: AsRef<str>,
{
    let index = CorpusIndex::build(titles, store)?;
    let range = assign_range(worker_id, config.workers, index.total_size())?;
    debug!("Worker {} assigned {} of {} bytes", worker_id, range, index.total_size());
    count_range(&index, store, vocab, range, config.scan_options(), abort)
}

/// Runs `config.workers` workers over the corpus and sums their tables.
///
/// The root waits for a result from every worker before reducing. If any
/// worker fails, the others are told to stop and no table is returned.
pub fn run_partitioned<S, T>(
    config: &RunConfig,
    titles: &[T],
    store: &S,
    vocab: &Vocabulary,
) -> Result<FrequencyTable>
where
    S: DocumentStore + ?Sized,
    T: AsRef<str> + Sync,
{
    config.validate_for_corpus(titles.len())?;
    let abort = AbortSignal::default();
    let (snd, rcv) = bounded(config.workers);
    let mut global = FrequencyTable::new(titles.len(), vocab.len());
    let mut first_error: Option<TokfreakError> = None;
    let mut reported = vec![false; config.workers];

    let outcome = crossbeam::scope(|scope| {
        for worker_id in 0..config.workers {
            let snd = snd.clone();
            let abort = &abort;
            scope.spawn(move |_| {
                let _guard = RaiseOnPanic(abort);
                let result = run_worker(worker_id, config, titles, store, vocab, abort);
                if let Err(err) = &result {
                    if !err.is_aborted() {
                        warn!("Worker {} failed: {}", worker_id, err);
                        abort.raise();
                    }
                }
                // The root holds the receiver until every sender is gone.
                let _ = snd.send((worker_id, result));
            });
        }
        drop(snd);

        for (worker_id, result) in rcv.iter() {
            reported[worker_id] = true;
            match result {
                Ok(local) => {
                    debug!("Worker {} reported {} hits", worker_id, local.total());
                    if first_error.is_none() {
                        if let Err(err) = global.merge(&local) {
                            first_error = Some(err);
                        }
                    }
                }
                Err(err) => {
                    let replace = match &first_error {
                        None => true,
                        Some(prev) => prev.is_aborted() && !err.is_aborted(),
                    };
                    if replace {
                        first_error = Some(err);
                    }
                }
            }
        }
    });

    // A worker that panicked never reported.
    if outcome.is_err() {
        let silent = reported.iter().position(|seen| !seen).unwrap_or(0);
        return Err(TokfreakError::WorkerPanicked(silent));
    }
    if let Some(err) = first_error {
        return Err(err);
    }
    if let Some(silent) = reported.iter().position(|seen| !seen) {
        return Err(TokfreakError::Internal(format!("worker {} never reported", silent)));
    }
    info!("Reduced {} worker tables, {} hits", config.workers, global.total());
    Ok(global)
}

/// Counts the whole corpus in one pass, document by document.
pub fn count_sequential<S, T>(
    titles: &[T],
    store: &S,
    vocab: &Vocabulary,
    options: ScanOptions,
) -> Result<FrequencyTable>
where
    S: DocumentStore + ?Sized,
    T: AsRef<str>,
{
    let mut table = FrequencyTable::new(titles.len(), vocab.len());
    for (doc, title) in titles.iter().enumerate() {
        let title = title.as_ref();
        let mut tokens = TokenReader::new(store.open(title)?, title, 0, options);
        tokens.for_each_token(|tok| {
            if let Some(col) = vocab.get(tok) {
                table.increment(doc, col as usize);
            }
        })?;
    }
    Ok(table)
}

/// Counts every distinct token across the corpus, one document per rayon task.
pub fn scan_vocabulary<S, T>(titles: &[T], store: &S, options: ScanOptions) -> Result<VocabBuilder>
where
    S: DocumentStore + ?Sized,
    T: AsRef<str> + Sync,
{
    titles
        .par_iter()
        .try_fold(VocabBuilder::new, |mut acc, title| -> Result<VocabBuilder> {
            let title = title.as_ref();
            let mut tokens = TokenReader::new(store.open(title)?, title, 0, options);
            tokens.for_each_token(|tok| {
                if !tok.is_empty() {
                    acc.add(tok);
                }
            })?;
            Ok(acc)
        })
        .try_reduce(VocabBuilder::new, |left, right| Ok(left.merged(right)))
}
