use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Stderr logger, `[HH:MM:SS] LEVEL: message` with time since startup.
/// Warn by default, Info when verbose. `RUST_LOG` overrides both.
pub fn init_logger(verbose: bool) {
    START_TIME.set(Instant::now()).ok();
    let level = if verbose { log::LevelFilter::Info } else { log::LevelFilter::Warn };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            let secs = START_TIME.get_or_init(Instant::now).elapsed().as_secs();
            writeln!(
                buf,
                "[{:02}:{:02}:{:02}] {}: {}",
                secs / 3600,
                (secs % 3600) / 60,
                secs % 60,
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .try_init();
}
