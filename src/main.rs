use clap::Parser;
use std::path::PathBuf;
use std::process;

use rmviewer::logging::Logger;
use rmviewer::pipeline;

#[derive(Parser, Debug)]
#[command(name = "rmviewer", about = "Render RM selection charts as standalone HTML")]
struct Args {
    /// Path to the JSON viewer configuration
    #[arg(long = "config_view")]
    config_view: PathBuf,
}

fn main() {
    let args = Args::parse();

    if !args.config_view.exists() {
        eprintln!(
            "ERROR - Config file not found: {}",
            args.config_view.display()
        );
        process::exit(1);
    }

    let log = match Logger::from_env() {
        Ok(log) => log,
        Err(err) => {
            eprintln!("ERROR - cannot open log file: {}", err);
            process::exit(1);
        }
    };

    match pipeline::run(&args.config_view, &log) {
        Ok(report) if report.failed.is_empty() => {}
        Ok(report) => {
            let failed: Vec<&str> = report.failed.iter().map(|k| k.label()).collect();
            eprintln!("WARN - charts not generated: {}", failed.join(", "));
        }
        Err(err) => {
            eprintln!("ERROR - {}", err);
            process::exit(1);
        }
    }
}
