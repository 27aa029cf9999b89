//! CLI argument and command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lark", version, about = "Run prompts and tools against LLM providers")]
pub struct Cli {
    /// Provider to use (defaults to `default_provider` from the config file).
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Model to use (defaults to the provider's default model).
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Config file to read instead of ~/.lark/config.json.
    #[arg(long, env = "LARK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send one prompt and print the answer.
    Chat {
        /// The prompt to send.
        prompt: String,

        /// Print the answer as it is generated.
        #[arg(long)]
        stream: bool,

        /// System message placed before the prompt.
        #[arg(long)]
        system: Option<String>,

        /// Sampling temperature (0 to 2).
        #[arg(long)]
        temperature: Option<f32>,

        /// Maximum number of tokens to generate.
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Offer the registered tools to the model.
        #[arg(long)]
        with_tools: bool,
    },

    /// List registered providers.
    Providers,

    /// List registered tools, or show one tool's parameters.
    Tools {
        /// Tool to describe.
        name: Option<String>,
    },

    /// Run a tool directly.
    Tool {
        /// Tool name.
        name: String,

        /// Arguments as a JSON object.
        #[arg(default_value = "{}")]
        args: String,
    },
}
