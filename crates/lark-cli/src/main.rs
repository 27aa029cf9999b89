//! lark: send prompts to LLM providers and run tools from the terminal.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use lark_core::{ConfigFile, Runtime};
use lark_provider::providers::hosted::builtin_specs;
use lark_provider::providers::echo::ECHO;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("lark=debug,lark_core=debug,lark_provider=debug,lark_tools=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let config_file = cli.config.map(ConfigFile::at).unwrap_or_default();
    let mut config = config_file.load();
    let names: Vec<String> = builtin_specs()
        .into_iter()
        .map(|spec| spec.name)
        .chain([ECHO.to_string()])
        .collect();
    config.apply_env(names.iter().map(String::as_str));

    let runtime = Runtime::bootstrap(&config, &std::env::current_dir()?)?;

    match cli.command {
        Commands::Chat {
            prompt,
            stream,
            system,
            temperature,
            max_tokens,
            with_tools,
        } => {
            let request = commands::chat::ChatRequest {
                prompt,
                system,
                provider: cli.provider,
                model: cli.model,
                stream,
                temperature,
                max_tokens,
                with_tools,
            };
            commands::chat::run(&runtime, request).await?;
        }
        Commands::Providers => commands::providers::run(&runtime),
        Commands::Tools { name } => commands::tools::list(&runtime, name.as_deref())?,
        Commands::Tool { name, args } => commands::tools::invoke(&runtime, &name, &args).await?,
    }

    Ok(())
}
