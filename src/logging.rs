use std::path::Path;

use flexi_logger::{
    detailed_format, Cleanup, Criterion, Duplicate, FileSpec, FlexiLoggerError, Logger, Naming,
    WriteMode,
};

pub const LOG_FILE_BASENAME: &str = "donext";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 10;

fn log_spec() -> String {
    // Keep dependency logs at WARN by default; our crate is more verbose in
    // debug builds. Users can override with `DONEXT_LOG` or `RUST_LOG`.
    let default_spec = if cfg!(debug_assertions) {
        "warn,donext=debug"
    } else {
        "warn,donext=info"
    };
    std::env::var("DONEXT_LOG")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .or_else(|| {
            std::env::var("RUST_LOG")
                .ok()
                .filter(|value| !value.trim().is_empty())
        })
        .unwrap_or_else(|| default_spec.to_string())
}

/// File logging for the CLI: rotated log files next to the user's data.
pub fn init_logging(data_dir: &Path) -> Result<(), FlexiLoggerError> {
    std::fs::create_dir_all(data_dir)?;

    Logger::try_with_str(log_spec())?
        .log_to_file(
            FileSpec::default()
                .directory(data_dir)
                .basename(LOG_FILE_BASENAME)
                .suffix(LOG_FILE_SUFFIX),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stderr(if cfg!(debug_assertions) {
            Duplicate::Info
        } else {
            Duplicate::None
        })
        .start()?;

    install_panic_hook();
    Ok(())
}

/// Console logging for the greeting endpoint server.
pub fn init_console_logging() -> Result<(), FlexiLoggerError> {
    Logger::try_with_str(log_spec())?
        .log_to_stderr()
        .start()?;
    install_panic_hook();
    Ok(())
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("<non-string panic payload>");
        let location = info
            .location()
            .map(|loc| format!("{loc}"))
            .unwrap_or_else(|| "<unknown>".to_string());
        let backtrace = std::backtrace::Backtrace::force_capture();

        // Best-effort: even if the logger is unavailable, still run the default hook.
        log::error!("panic: payload={payload} location={location}\nbacktrace:\n{backtrace}");
        default_hook(info);
    }));
}
