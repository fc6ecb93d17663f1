use clap::Parser;

use donext::commands::{self, Cli, CommandError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match commands::run(cli).await {
        Ok(()) => {}
        Err(CommandError::Reported) => std::process::exit(1),
        Err(CommandError::Message(message)) => {
            eprintln!("error: {message}");
            std::process::exit(1);
        }
    }
}
