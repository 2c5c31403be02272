use log::LevelFilter;

// Module prefixes owned by the migration tools. Library crates are all named
// `cosmo_migrate*`, binaries `move_workspace_*`.
const OWN_MODULE_PREFIXES: [&str; 2] = ["cosmo_migrate", "move_workspace"];

pub fn own_log_level(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Third-party crates log at warn, our own modules at info (or debug).
/// `RUST_LOG` is applied last and wins.
pub fn init_logger(debug: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Warn);
    for prefix in OWN_MODULE_PREFIXES {
        builder.filter_module(prefix, own_log_level(debug));
    }
    builder.parse_default_env();
    // try_init fails when a logger is already installed.
    let _ = builder.try_init();
}
