//! agent-tools binary entry point.

use std::process::ExitCode;

use agent_tools::cli::{parse_args, print_help, print_version};
use agent_tools::config::Config;
use agent_tools::security::generate_api_key;
use agent_tools::{api, logging};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("run with --help for usage");
            return ExitCode::from(2);
        }
    };

    if args.help {
        print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        print_version();
        return ExitCode::SUCCESS;
    }
    if args.generate_key {
        println!("{}", generate_api_key());
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _ = logging::init_with_filter(config.log_filter());
    info!("agent-tools v{}", env!("CARGO_PKG_VERSION"));

    let server_config = match config.to_server_config() {
        Ok(server_config) => server_config,
        Err(e) => {
            error!("invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match api::serve(server_config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
