use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use studymate::chat::Assistant;
use studymate::config::Config;

#[derive(Parser)]
#[command(name = "studymate", version, about = "Terminal academic assistant")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.json")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat (default)
    Chat,
    /// Answer a single question and exit
    Ask {
        /// The question
        question: Vec<String>,
    },
    /// Rebuild the document index from scratch
    Reindex,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => {
            let mut assistant = Assistant::new(config)?;
            assistant.run_repl()?;
        }
        Command::Ask { question } => {
            let question = question.join(" ");
            anyhow::ensure!(!question.trim().is_empty(), "no question given");
            let mut assistant = Assistant::new(config)?;
            println!("{}", assistant.answer_once(&question));
        }
        Command::Reindex => {
            let mut assistant = Assistant::new(config)?;
            assistant.reindex()?;
            println!("Index rebuilt.");
        }
    }

    Ok(())
}
