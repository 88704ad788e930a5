//! Writing the global table. Nothing is visible at the destination until the
//! whole output has been written.

use std::fs::{self, File};
use std::io::prelude::*;
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;

use simple_error::SimpleError;
use tempfile::Builder;

use crate::error::{Result, TokfreakError};
use crate::table::FrequencyTable;
use crate::vocab::Vocabulary;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    TermDocMat,
}

impl FromStr for OutputFormat {
    type Err = SimpleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s == "csv" {
            Ok(OutputFormat::Csv)
        } else if s == "tdmat" {
            Ok(OutputFormat::TermDocMat)
        } else {
            Err(SimpleError::new("Must be csv or tdmat"))
        }
    }
}

fn write_field<W: Write>(out: &mut W, field: &[u8]) -> std::io::Result<()> {
    if field.iter().any(|b| matches!(b, b',' | b'"' | b'\n' | b'\r')) {
        out.write_all(b"\"")?;
        for (idx, chunk) in field.split(|b| *b == b'"').enumerate() {
            if idx > 0 {
                out.write_all(b"\"\"")?;
            }
            out.write_all(chunk)?;
        }
        out.write_all(b"\"")
    } else {
        out.write_all(field)
    }
}

/// Header `book,<word>...`, then one `<title>,<count>...` row per document.
pub fn write_csv<W, T>(mut out: W, titles: &[T], vocab: &Vocabulary, table: &FrequencyTable) -> std::io::Result<()>
where
    W: Write,
    T: AsRef<str>,
{
    out.write_all(b"book")?;
    for word in vocab.words() {
        out.write_all(b",")?;
        write_field(&mut out, word)?;
    }
    out.write_all(b"\n")?;
    for (title, row) in titles.iter().zip(table.iter_rows()) {
        write_field(&mut out, title.as_ref().as_bytes())?;
        for cnt in row {
            write!(out, ",{}", cnt)?;
        }
        out.write_all(b"\n")?;
    }
    out.flush()
}

fn io_err(path: &Path) -> impl Fn(std::io::Error) -> TokfreakError + '_ {
    move |err| TokfreakError::io(err, Some(path.to_owned()))
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Temporary files get the same mode a plain `File::create` would.
fn staging_builder<'a, 'b>(mode: u32) -> Builder<'a, 'b> {
    let mut builder = Builder::new();
    builder.prefix(".tokfreak");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(mode));
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder
}

/// Runs `write` against a temporary file next to `path`, then renames it
/// into place.
pub fn write_file_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&File>) -> std::io::Result<()>,
{
    let tmp = staging_builder(0o666).tempfile_in(parent_dir(path)).map_err(io_err(path))?;
    {
        let mut out = BufWriter::new(tmp.as_file());
        write(&mut out).map_err(io_err(path))?;
        out.flush().map_err(io_err(path))?;
    }
    tmp.persist(path).map_err(|err| TokfreakError::io(err.error, Some(path.to_owned())))?;
    Ok(())
}

/// Writes the CSV next to `path` and renames it into place.
pub fn write_csv_file<T: AsRef<str>>(
    path: &Path,
    titles: &[T],
    vocab: &Vocabulary,
    table: &FrequencyTable,
) -> Result<()> {
    write_file_atomic(path, |out| write_csv(out, titles, vocab, table))
}

/// Sparse CSR term-document matrix, one file per array.
pub struct TermDocMatWriter {
    vocab_len: u64,
    num_docs: u64,
    num_values: u64,
    data_counts: BufWriter<File>,
    data_norm: BufWriter<File>,
    indices: BufWriter<File>,
    indptr: BufWriter<File>,
    dims: BufWriter<File>,
}

impl TermDocMatWriter {
    pub fn new(out_dir: &Path, vocab_len: u64) -> Result<TermDocMatWriter> {
        fs::create_dir_all(out_dir).map_err(io_err(out_dir))?;
        let create = |name: &str| {
            let path = out_dir.join(name);
            File::create(&path)
                .map(BufWriter::new)
                .map_err(|err| TokfreakError::io(err, Some(path)))
        };

        Ok(TermDocMatWriter {
            vocab_len,
            num_docs: 0,
            num_values: 0,
            data_counts: create("data_counts")?,
            data_norm: create("data_norm")?,
            indices: create("indices")?,
            indptr: create("indptr")?,
            dims: create("dims")?,
        })
    }

    /// Appends one document row, storing only non-zero cells.
    pub fn write_doc(&mut self, row: &[u64]) -> std::io::Result<()> {
        self.indptr.write_all(&self.num_values.to_le_bytes())?;
        let mut total: f64 = 0.0;
        for (col, &val) in row.iter().enumerate().filter(|(_, val)| **val > 0) {
            self.indices.write_all(&(col as u32).to_le_bytes())?;
            self.data_counts.write_all(&val.to_le_bytes())?;
            total += (val as f64).powi(2);
            self.num_values += 1;
        }
        let total_sqrt = total.sqrt();
        for &val in row.iter().filter(|val| **val > 0) {
            self.data_norm.write_all(&(((val as f64) / total_sqrt) as f32).to_le_bytes())?;
        }
        self.num_docs += 1;
        Ok(())
    }

    pub fn close(mut self) -> std::io::Result<(u64, u64, u64)> {
        self.indptr.write_all(&self.num_values.to_le_bytes())?;
        self.data_counts.flush()?;
        self.data_norm.flush()?;
        self.indices.flush()?;
        self.indptr.flush()?;
        self.dims.write_all(&self.num_docs.to_le_bytes())?;
        self.dims.write_all(&self.vocab_len.to_le_bytes())?;
        self.dims.flush()?;
        Ok((self.num_docs, self.vocab_len, self.num_values))
    }
}

/// Writes the matrix plus `titles` and `vocab` into a fresh directory, then
/// moves it to `out_dir`, which must not exist yet.
pub fn write_term_doc_mat<T: AsRef<str>>(
    out_dir: &Path,
    titles: &[T],
    vocab: &Vocabulary,
    table: &FrequencyTable,
) -> Result<(u64, u64, u64)> {
    if out_dir.exists() {
        return Err(TokfreakError::InvalidConfig(format!(
            "output directory {:?} already exists",
            out_dir
        )));
    }
    let staging = staging_builder(0o777).tempdir_in(parent_dir(out_dir)).map_err(io_err(out_dir))?;
    let mut writer = TermDocMatWriter::new(staging.path(), vocab.len() as u64)?;
    for row in table.iter_rows() {
        writer.write_doc(row).map_err(io_err(out_dir))?;
    }
    let dims = writer.close().map_err(io_err(out_dir))?;

    let mut titles_out = BufWriter::new(File::create(staging.path().join("titles")).map_err(io_err(out_dir))?);
    for title in titles {
        writeln!(titles_out, "{}", title.as_ref()).map_err(io_err(out_dir))?;
    }
    titles_out.flush().map_err(io_err(out_dir))?;
    let vocab_out = BufWriter::new(File::create(staging.path().join("vocab")).map_err(io_err(out_dir))?);
    vocab.write(vocab_out, false).map_err(io_err(out_dir))?;

    let staged = staging.keep();
    if let Err(err) = fs::rename(&staged, out_dir) {
        let _ = fs::remove_dir_all(&staged);
        return Err(TokfreakError::io(err, Some(out_dir.to_owned())));
    }
    Ok(dims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Vec<&'static str>, Vocabulary, FrequencyTable) {
        let vocab = Vocabulary::from_words(vec!["a", "b"]).unwrap();
        let table = FrequencyTable::from_rows(vec![vec![2, 1], vec![0, 2]]).unwrap();
        (vec!["doc0", "doc1"], vocab, table)
    }

    fn read_u64s(path: &Path) -> Vec<u64> {
        fs::read(path)
            .unwrap()
            .chunks(8)
            .map(|c| u64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect()
    }

    #[test]
    fn csv_layout() {
        let (titles, vocab, table) = sample();
        let mut out = Vec::new();
        write_csv(&mut out, &titles, &vocab, &table).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "book,a,b\ndoc0,2,1\ndoc1,0,2\n");
    }

    #[test]
    fn titles_with_commas_are_quoted() {
        let vocab = Vocabulary::from_words(vec!["a"]).unwrap();
        let table = FrequencyTable::from_rows(vec![vec![1]]).unwrap();
        let mut out = Vec::new();
        write_csv(&mut out, &["Romeo, Juliet"], &vocab, &table).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "book,a\n\"Romeo, Juliet\",1\n");
    }

    #[test]
    fn csv_file_is_replaced_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bag_of_words.csv");
        fs::write(&path, "stale").unwrap();
        let (titles, vocab, table) = sample();
        write_csv_file(&path, &titles, &vocab, &table).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "book,a,b\ndoc0,2,1\ndoc1,0,2\n");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn term_doc_mat_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("tdmat");
        let (titles, vocab, table) = sample();
        let dims = write_term_doc_mat(&out, &titles, &vocab, &table).unwrap();
        assert_eq!(dims, (2, 2, 3));
        assert_eq!(read_u64s(&out.join("indptr")), vec![0, 2, 3]);
        assert_eq!(read_u64s(&out.join("data_counts")), vec![2, 1, 2]);
        assert_eq!(read_u64s(&out.join("dims")), vec![2, 2]);
        assert_eq!(fs::read(out.join("indices")).unwrap().len(), 3 * 4);
        assert_eq!(fs::read(out.join("data_norm")).unwrap().len(), 3 * 4);
        assert_eq!(fs::read_to_string(out.join("titles")).unwrap(), "doc0\ndoc1\n");
        assert_eq!(fs::read_to_string(out.join("vocab")).unwrap(), "a,b\n");

        assert!(write_term_doc_mat(&out, &titles, &vocab, &table).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn outputs_get_default_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let mode = |path: &Path| fs::metadata(path).unwrap().permissions().mode() & 0o777;

        let dir = tempfile::tempdir().unwrap();
        let plain_file = dir.path().join("plain");
        File::create(&plain_file).unwrap();
        let plain_dir = dir.path().join("plain_dir");
        fs::create_dir(&plain_dir).unwrap();

        let (titles, vocab, table) = sample();
        let csv = dir.path().join("bag_of_words.csv");
        write_csv_file(&csv, &titles, &vocab, &table).unwrap();
        assert_eq!(mode(&csv), mode(&plain_file));

        let tdmat = dir.path().join("tdmat");
        write_term_doc_mat(&tdmat, &titles, &vocab, &table).unwrap();
        assert_eq!(mode(&tdmat), mode(&plain_dir));
        assert_eq!(mode(&tdmat.join("indptr")), mode(&plain_file));
    }
}
