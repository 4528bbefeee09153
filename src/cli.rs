use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "photoconv")]
#[command(author, version, about = "Telegram bot that converts photos between image formats", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot with long polling (default)
    Run,

    /// Apply database migrations and exit
    Migrate,

    /// Verify the configuration loads and ffmpeg is available
    Check,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The subcommand to run; `run` when none was given.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}
