use clap::Parser;
use cosmo_migrate::args::MoveWorkspaceSecretArgs;
use cosmo_migrate_common::logger::init_logger;

fn main() {
    dotenvy::dotenv().ok();
    let args = MoveWorkspaceSecretArgs::parse();
    init_logger(args.debug);
    if let Err(e) = cosmo_migrate::secret::run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
