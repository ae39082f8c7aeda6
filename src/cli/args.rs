use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "rollcall")]
#[command(about = "Meeting attendance bot for the Zoom web client", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Join a meeting and track attendance until stopped
    Join(JoinCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct JoinCliArgs {
    /// Meeting id (spaces are fine, they are stripped)
    pub meeting_id: String,

    /// Meeting passcode
    #[arg(short, long)]
    pub passcode: String,

    /// Display name to join with (overrides config)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Run the browser headless (overrides config)
    #[arg(long)]
    pub headless: bool,
}
