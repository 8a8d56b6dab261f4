use env_logger::{Builder, Env};
use std::io::Write;

/// Starts the timestamped logger. `RUST_LOG` wins over `verbose`.
pub fn init_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_filter))
        .format(|buf, record| {
            let timestamp = buf.timestamp();
            writeln!(
                buf,
                "[{}] [{}] {}",
                timestamp,
                record.level(),
                record.args()
            )
        })
        .init();
}
