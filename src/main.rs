use clap::Parser;

use pixelreel::cli::{self, CliArgs};
use pixelreel::settings::AppSettings;
use pixelreel::{log_info, logger};

fn main() {
    // Initialize session log (overwrites previous session log)
    logger::init();

    let settings = AppSettings::load();
    log_info!("Settings loaded: {:?}", settings);

    let args = CliArgs::parse();
    let code = cli::run(args, &settings);
    std::process::exit(if code == std::process::ExitCode::SUCCESS {
        0
    } else {
        1
    });
}
