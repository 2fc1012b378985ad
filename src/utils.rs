// In: src/utils.rs

use std::fs::OpenOptions;
use std::sync::Once;

use log::LevelFilter;

use crate::error::Result;

static INIT_LOGGER: Once = Once::new();

/// Environment variable that overrides the filter chosen by `verbose`.
pub const LOG_ENV: &str = "PZIP_LOG";

/// Installs the process-wide logger. Only the first call has any effect.
///
/// Records go to stderr, or are appended to `log_file` when one is given.
pub fn init_logging(verbose: bool, log_file: Option<&str>) -> Result<()> {
    // Open the file before `call_once` so the error can reach the caller.
    let file = match log_file {
        Some(path) => Some(OpenOptions::new().append(true).create(true).open(path)?),
        None => None,
    };

    INIT_LOGGER.call_once(|| {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        });
        builder.parse_env(LOG_ENV);

        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(file) = file {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });
    Ok(())
}
