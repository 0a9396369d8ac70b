use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use gmail_tool::auth::token_manager::TokenManager;
use gmail_tool::config::Settings;
use gmail_tool::mail::query::SearchFilter;
use gmail_tool::mail::session::Session;
use gmail_tool::terminal::commands::{self, INBOX_QUERY};
use gmail_tool::terminal::{self, MenuOption};

#[derive(Parser)]
#[command(name = "gmail_tool")]
#[command(about = "List and read Gmail messages from the command line", long_about = None)]
struct Cli {
    /// Settings file (defaults to ./gmail_tool.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Without a subcommand an interactive menu is shown
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the OAuth flow and save a fresh token
    CreateToken,

    /// List message IDs matching a search query
    ListIds {
        #[arg(long, default_value = INBOX_QUERY)]
        query: String,
    },

    /// Show one message (lists the inbox and prompts when ID is omitted)
    Read { id: Option<String> },

    /// Show details of every message matching the filter
    Filter {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        /// Start date, YYYY/MM/DD
        #[arg(long)]
        after: Option<String>,
        /// End date, YYYY/MM/DD
        #[arg(long)]
        before: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Configuration error")?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    let cmd = match cli.cmd {
        Some(cmd) => cmd,
        None => match terminal::prompt_menu(&mut input, &mut out)? {
            Some(MenuOption::CreateToken) => Command::CreateToken,
            Some(MenuOption::ListIds) => Command::ListIds {
                query: INBOX_QUERY.to_string(),
            },
            Some(MenuOption::ReadOne) => Command::Read { id: None },
            Some(MenuOption::ListWithFilter) => Command::Filter {
                from: None,
                to: None,
                subject: None,
                after: None,
                before: None,
            },
            None => {
                println!("Invalid option selected.");
                bail!("invalid menu option");
            }
        },
    };

    run(cmd, &settings, &mut input, &mut out)
}

fn run<R: BufRead, W: Write>(
    cmd: Command,
    settings: &Settings,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    let tokens = TokenManager::from_settings(settings)?;
    let connect = || -> Result<Session> {
        let token = tokens.access_token().context("Failed to obtain a token")?;
        Session::connect(settings, &token).context("Failed to initialize Gmail client")
    };

    match cmd {
        Command::CreateToken => {
            tokens.create_token().context("Failed to create token")?;
            writeln!(
                out,
                "Token created successfully and saved to {}",
                tokens.store().path().display()
            )?;
        }

        Command::ListIds { query } => {
            commands::list_ids(&connect()?, &query, out)?;
        }

        Command::Read { id } => {
            commands::read_one(&connect()?, id, input, out)?;
        }

        Command::Filter {
            from,
            to,
            subject,
            after,
            before,
        } => {
            let given = SearchFilter {
                from,
                to,
                subject,
                after,
                before,
            };
            let filter = commands::resolve_filter(given, input, out)?;
            commands::list_filtered(&connect()?, &filter, out)?;
        }
    }

    Ok(())
}
