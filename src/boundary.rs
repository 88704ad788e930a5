//! Token alignment for range starts that were cut without looking at the
//! bytes.
//!
//! A token belongs to the worker whose range holds its first byte. A worker
//! whose raw start falls inside a token therefore skips the tail of that
//! token; the worker before it reads the whole token even though it runs past
//! its own end.

use std::io::{BufRead, Read, Seek, SeekFrom};

use crate::error::{Result, TokfreakError};
use crate::types::ScanOptions;

/// Returns the first token start at or after `raw_offset` within one
/// document, leaving `reader` positioned there.
///
/// The scan is bounded to the document: running off its end returns the
/// document length, since a document end always terminates a token. Failing
/// to find a delimiter within `max_token_len` bytes means the document is not
/// a token stream and is reported as [`TokfreakError::BoundaryNotFound`].
pub fn locate_start<R>(reader: &mut R, title: &str, raw_offset: u64, options: ScanOptions) -> Result<u64>
where
    R: BufRead + Seek + ?Sized,
{
    let io_err = |err: std::io::Error| TokfreakError::io(err, Some(title.into()));
    if raw_offset == 0 {
        reader.seek(SeekFrom::Start(0)).map_err(io_err)?;
        return Ok(0);
    }

    reader.seek(SeekFrom::Start(raw_offset - 1)).map_err(io_err)?;
    let mut prev = [0u8; 1];
    let read = reader.read(&mut prev).map_err(io_err)?;
    if read == 0 {
        return Err(TokfreakError::Internal(format!(
            "start offset {} is past the end of {:?}",
            raw_offset, title
        )));
    }
    if prev[0] == options.delimiter {
        return Ok(raw_offset);
    }

    let mut skipped = Vec::new();
    let limit = options.max_token_len as u64 + 1;
    let scanned = (&mut *reader)
        .take(limit)
        .read_until(options.delimiter, &mut skipped)
        .map_err(io_err)?;
    if skipped.last() == Some(&options.delimiter) || (scanned as u64) < limit {
        Ok(raw_offset + scanned as u64)
    } else {
        Err(TokfreakError::BoundaryNotFound {
            document: title.to_owned(),
            offset: raw_offset,
            scanned,
        })
    }
}
