use clap::Parser;
use cosmo_migrate::args::MoveWorkspaceFilesArgs;
use cosmo_migrate_common::logger::init_logger;

fn main() {
    dotenvy::dotenv().ok();
    let args = MoveWorkspaceFilesArgs::parse();
    init_logger(args.debug);
    if let Err(e) = cosmo_migrate::files::run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
