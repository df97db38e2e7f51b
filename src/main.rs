// main.rs

use clap::Parser;
use cli_log::{info, warn};
use roundtable::classroom::{model_classroom, scripted_classroom, seed_messages};
use roundtable::config::Config;
use roundtable::{AdminDirected, ChatDriver, ChatError};
use std::path::PathBuf;

/// Runs the math class group chat and prints its transcript.
#[derive(Parser, Debug, Clone)]
#[command(name = "roundtable", version, about, long_about = None)]
struct Cli {
    /// Back every agent with the Ollama model instead of the scripted class
    #[arg(long)]
    ollama: bool,

    /// Path to the configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    cli_log::init_cli_log!();

    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;
    info!("loaded configuration from {}", cli.config.display());

    let chat = if cli.ollama {
        info!("running the class on model {}", config.model());
        model_classroom(&config)?
    } else {
        scripted_classroom()?
    };

    let result = ChatDriver::new(chat)
        .seeds(seed_messages())
        .max_round(config.max_round)
        .invocation_retries(config.invocation_retries)
        .selector(AdminDirected::new())
        .run()
        .await;

    let transcript = match result {
        Ok(transcript) => transcript,
        Err(ChatError::Aborted(aborted)) => {
            for message in &aborted.history {
                println!("{}", message.format());
            }
            return Err(aborted.into());
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", transcript.format());
    if config.debug {
        println!("{}", serde_json::to_string_pretty(&transcript)?);
    }
    if let Some(path) = &config.transcript_path {
        match transcript.save(path) {
            Ok(()) => info!("transcript written to {}", path.display()),
            Err(e) => warn!("could not write transcript to {}: {}", path.display(), e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["roundtable"]).unwrap();
        assert!(!cli.ollama);
        assert_eq!(cli.config, PathBuf::from("config.json"));
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from(["roundtable", "--ollama", "--config", "class.json"]).unwrap();
        assert!(cli.ollama);
        assert_eq!(cli.config, PathBuf::from("class.json"));
        assert!(Cli::try_parse_from(["roundtable", "--teleport"]).is_err());
    }
}
