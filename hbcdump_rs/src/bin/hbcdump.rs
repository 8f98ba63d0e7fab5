use clap::Parser;
use tracing_subscriber::EnvFilter;

use hbcdump::cli::{Args, DumpConfig, run};

fn main() {
    let args = Args::parse();

    // Diagnostics go to stderr; stdout belongs to the command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .init();

    let config = DumpConfig::from(&args);
    if let Err(err) = run(&config) {
        // A closed stdout pipe maps to 0 and stays silent.
        let code = err.exit_code();
        if code != 0 {
            eprintln!("Error: {err}");
        }
        std::process::exit(code);
    }
}
