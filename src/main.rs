use clap::Parser;

use bosh_rackhd_cpi::api::cpi_response_dto::CpiResponseDto;
use bosh_rackhd_cpi::{logger, run_cpi};

/// BOSH CPI for bare-metal nodes managed by a RackHD-style fleet API.
#[derive(Debug, Parser)]
#[command(name = "cpi", version)]
struct Args {
    /// Path to the CPI configuration file.
    #[arg(long = "configPath")]
    config_path: String,
}

/// The director passes Go-style single-dash long flags.
fn normalize_args(args: impl Iterator<Item = String>) -> Vec<String> {
    args.map(|arg| if arg.starts_with("-configPath") { format!("-{}", arg) } else { arg }).collect()
}

#[tokio::main]
async fn main() {
    let log_buffer = logger::init();
    let args = Args::parse_from(normalize_args(std::env::args()));

    let response = match run_cpi(&args.config_path, std::io::stdin().lock()).await {
        Ok(result) => CpiResponseDto::success(result, log_buffer.contents()),
        Err(e) => {
            log::error!("CpiFailed: {}", e);
            CpiResponseDto::failure(&e, log_buffer.contents())
        }
    };

    let exit_code = if response.error.is_some() { 1 } else { 0 };
    match serde_json::to_string(&response) {
        Ok(document) => println!("{}", document),
        Err(e) => {
            eprintln!("Failed to serialize CPI response: {}", e);
            std::process::exit(1);
        }
    }

    std::process::exit(exit_code);
}
