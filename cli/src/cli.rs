//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::app::{AppContext, AppFlags, OutputFlags};
use crate::commands;
use crate::infra::config::TargetOverrides;
use crate::output::OutputContext;

/// Revise running Cloud Foundry apps from a natural language prompt
#[derive(Parser)]
#[command(
    name = "cf-prompt",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    #[command(flatten)]
    pub target: TargetArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Platform target overrides. Unset values come from the CF CLI config.
#[derive(Args, Debug, Default)]
pub struct TargetArgs {
    /// API endpoint
    #[arg(long, global = true, env = "CF_API", value_name = "URL")]
    pub api: Option<String>,

    /// Access token, with or without its `bearer` scheme
    #[arg(long, global = true, env = "CF_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Organization guid
    #[arg(long, global = true, env = "CF_ORG_GUID", value_name = "GUID")]
    pub org_guid: Option<String>,

    /// Space guid
    #[arg(long, global = true, env = "CF_SPACE_GUID", value_name = "GUID")]
    pub space_guid: Option<String>,

    /// Skip TLS certificate validation
    #[arg(long, global = true)]
    pub skip_ssl_validation: bool,
}

impl From<TargetArgs> for TargetOverrides {
    fn from(args: TargetArgs) -> Self {
        Self {
            api: args.api,
            token: args.token,
            org_guid: args.org_guid,
            space_guid: args.space_guid,
            skip_ssl_validation: args.skip_ssl_validation,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Revise an app's sources from a prompt and publish a new package
    Prompt(commands::prompt::PromptArgs),

    /// List an app's packages with their prompts
    Prompts(commands::prompts::PromptsArgs),

    /// Provision the persistent satellite for an app
    PromptInit(commands::prompt_init::PromptInitArgs),

    /// Make a package the app's current droplet, staging it if needed
    PromptPush(commands::prompt_push::PromptPushArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be resolved or the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            json,
            quiet,
            no_color,
            target,
            command,
        } = self;

        if matches!(command, Command::Version) {
            commands::version::run(&OutputContext::new(no_color, quiet, json));
            return Ok(());
        }

        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            target: target.into(),
        })?;
        match command {
            Command::Prompt(args) => commands::prompt::run(&args, &app).await,
            Command::Prompts(args) => commands::prompts::run(&args, &app).await,
            Command::PromptInit(args) => commands::prompt_init::run(&args, &app).await,
            Command::PromptPush(args) => commands::prompt_push::run(&args, &app).await,
            Command::Version => Ok(()),
        }
    }
}
