use std::path::PathBuf;
use std::process;

use argh::FromArgs;
use log::info;
use tokfreak::config::{RunConfig, DEFAULT_MAX_TOKEN_LEN};
use tokfreak::logging::init_logger;
use tokfreak::run::scan_vocabulary;
use tokfreak::store::FsStore;
use tokfreak::termdocmat::write_file_atomic;
use tokfreak::vocab::VocabOrder;
use tokfreak::{Result, TokfreakError};

#[derive(FromArgs)]
/// Build a vocabulary file from every distinct token in the documents.
struct MkVocab {
    /// directory holding the documents
    #[argh(option, default = "PathBuf::from(\"books\")")]
    books_dir: PathBuf,

    /// extension appended to each title, empty for none
    #[argh(option, default = "String::from(\"txt\")")]
    extension: String,

    /// output path
    #[argh(option, short = 'o', default = "PathBuf::from(\"vocabulary.csv\")")]
    output: PathBuf,

    /// drop words seen fewer times than this
    #[argh(option, default = "1")]
    min_count: u64,

    /// alphabetical or frequency
    #[argh(option, default = "VocabOrder::Alphabetical")]
    order: VocabOrder,

    /// start the file with a line holding the word count
    #[argh(switch)]
    with_count_header: bool,

    /// longest accepted token in bytes
    #[argh(option, default = "DEFAULT_MAX_TOKEN_LEN")]
    max_token_len: usize,

    /// log progress
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// document titles
    #[argh(positional)]
    titles: Vec<String>,
}

fn run(args: MkVocab) -> Result<()> {
    let config = RunConfig::builder().max_token_len(args.max_token_len).build()?;
    if args.titles.is_empty() {
        return Err(TokfreakError::InvalidConfig("at least one document is required".into()));
    }
    let store = FsStore::new(&args.books_dir, Some(args.extension.clone()));

    let timer = howlong::SteadyTimer::new();
    let builder = scan_vocabulary(&args.titles, &store, config.scan_options())?;
    println!("Gather counts {:.7}s", timer.elapsed().as_secs_f64());
    info!("{} distinct tokens", builder.len());

    let (vocab, _counts) = builder.build(args.min_count, args.order)?;
    info!("Vocab size: {}", vocab.len());

    write_file_atomic(&args.output, |out| vocab.write(out, args.with_count_header))?;
    info!("Wrote {}", args.output.display());
    Ok(())
}

fn main() {
    let args: MkVocab = argh::from_env();
    init_logger(args.verbose);
    if let Err(err) = run(args) {
        eprintln!("mk_vocab: {}", err);
        process::exit(1);
    }
}
