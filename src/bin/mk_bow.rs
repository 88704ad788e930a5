use std::convert::TryFrom;
use std::path::{Path, PathBuf};
use std::process;

use argh::FromArgs;
use log::info;
use tokfreak::config::{RunConfig, DEFAULT_MAX_TOKEN_LEN};
use tokfreak::logging::init_logger;
use tokfreak::run::{count_sequential, run_partitioned};
use tokfreak::store::{Backing, FsStore};
use tokfreak::termdocmat::{write_csv_file, write_term_doc_mat, OutputFormat};
use tokfreak::vocab::Vocabulary;
use tokfreak::{Result, TokfreakError};

#[derive(FromArgs)]
/// Count vocabulary words per document, splitting the corpus bytes between workers.
struct MkBow {
    /// directory holding the documents
    #[argh(option, default = "PathBuf::from(\"books\")")]
    books_dir: PathBuf,

    /// extension appended to each title, empty for none
    #[argh(option, default = "String::from(\"txt\")")]
    extension: String,

    /// comma-separated vocabulary file
    #[argh(option, default = "PathBuf::from(\"vocabulary.csv\")")]
    vocab: PathBuf,

    /// output path
    #[argh(option, short = 'o', default = "PathBuf::from(\"bag_of_words.csv\")")]
    output: PathBuf,

    /// csv or tdmat
    #[argh(option, default = "OutputFormat::Csv")]
    format: OutputFormat,

    /// number of workers, one per document by default
    #[argh(option, short = 'j')]
    workers: Option<usize>,

    /// fail unless there is exactly one worker per document
    #[argh(switch)]
    strict: bool,

    /// count in a single pass without workers
    #[argh(switch)]
    sequential: bool,

    /// token delimiter
    #[argh(option, default = "','")]
    delimiter: char,

    /// longest accepted token in bytes
    #[argh(option, default = "DEFAULT_MAX_TOKEN_LEN")]
    max_token_len: usize,

    /// read documents through a buffer instead of memory-mapping them
    #[argh(switch)]
    no_mmap: bool,

    /// log progress
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// document titles, in corpus order
    #[argh(positional)]
    titles: Vec<String>,
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    u8::try_from(u32::from(delimiter))
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| TokfreakError::InvalidConfig(format!("delimiter {:?} is not ASCII", delimiter)))
}

fn run(args: MkBow) -> Result<()> {
    let workers = args.workers.unwrap_or_else(|| args.titles.len());
    let config = RunConfig::builder()
        .workers(workers)
        .one_worker_per_document(args.strict)
        .delimiter(delimiter_byte(args.delimiter)?)
        .max_token_len(args.max_token_len)
        .build()?;
    config.validate_for_corpus(args.titles.len())?;

    let backing = if args.no_mmap { Backing::Buffered } else { Backing::Mmap };
    let store = FsStore::new(&args.books_dir, Some(args.extension.clone())).with_backing(backing);

    info!("Reading vocab");
    let vocab = Vocabulary::load(&args.vocab)?;
    info!("Vocab size: {}", vocab.len());

    let timer = howlong::SteadyTimer::new();
    let table = if args.sequential {
        info!("Counting {} documents sequentially", args.titles.len());
        count_sequential(&args.titles, &store, &vocab, config.scan_options())?
    } else {
        info!("Counting {} documents with {} workers", args.titles.len(), config.workers);
        run_partitioned(&config, &args.titles, &store, &vocab)?
    };
    println!("Counting took {:.7}s", timer.elapsed().as_secs_f64());

    write_output(args.format, &args.output, &args.titles, &vocab, &table)
}

fn write_output(
    format: OutputFormat,
    output: &Path,
    titles: &[String],
    vocab: &Vocabulary,
    table: &tokfreak::table::FrequencyTable,
) -> Result<()> {
    match format {
        OutputFormat::Csv => {
            write_csv_file(output, titles, vocab, table)?;
            info!("Wrote {} rows to {}", titles.len(), output.display());
        }
        OutputFormat::TermDocMat => {
            let (num_docs, vocab_len, num_values) = write_term_doc_mat(output, titles, vocab, table)?;
            info!("Num docs: {}", num_docs);
            info!("Num values: {}", num_values);
            info!("Density: {}", (num_values as f64) / ((num_docs * vocab_len).max(1) as f64));
        }
    }
    Ok(())
}

fn main() {
    let args: MkBow = argh::from_env();
    init_logger(args.verbose);
    if let Err(err) = run(args) {
        eprintln!("mk_bow: {}", err);
        process::exit(1);
    }
}
