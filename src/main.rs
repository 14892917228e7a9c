use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use vnet_range_allocator::cli::Cli;
use vnet_range_allocator::error::AllocError;

fn main() -> ExitCode {
    // Do as little as possible in main.rs as it can't contain any tests
    dotenv::dotenv().ok();
    if let Err(e) = vnet_range_allocator::init_logging() {
        eprintln!("{} {e}", "warning:".yellow());
    }
    let cli = Cli::parse();
    log::debug!("#Start main() {cli:?}");

    match vnet_range_allocator::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e
                .downcast_ref::<AllocError>()
                .map(AllocError::exit_code)
                .unwrap_or(1);
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::from(code)
        }
    }
}
