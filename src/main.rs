use clap::Parser;
use tree_copy::cli::commands::Cli;
use tree_copy::io::state::data_dir;
use tree_copy::logging::init_logging;

fn main() {
    let cli = Cli::parse();

    // Held until exit so buffered log lines are flushed
    let log_guard = init_logging(&data_dir());

    if let Err(e) = tree_copy::tui::run(&cli) {
        tracing::error!(error = %e, "fatal");
        eprintln!("error: {}", e);
        drop(log_guard);
        std::process::exit(1);
    }
}
