//! cf-prompt - revise running Cloud Foundry apps from a natural language prompt

use clap::Parser;

use cf_prompt_cli::cli::Cli;
use cf_prompt_cli::output::json;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = cli.run().await {
        if json_mode {
            if let Ok(out) = json::format_error(&format!("{e:#}"), json::error_code(&e)) {
                eprintln!("{out}");
            }
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }
}
