use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Once;

use tally_core::{ChatSettings, Period};

mod chat;
mod config;
mod finance_cmd;
mod llm;
mod settings_file;
mod shop_cmd;
mod state;

use finance_cmd::{AddArgs, Session};
use settings_file::SettingsFile;
use shop_cmd::ItemArgs;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TALLY_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "tally", version = VERSION, about = "Personal finance tracker with an AI assistant")]
struct Cli {
    /// Act as this user instead of [user] id from config.toml
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Income, expenses, balance and spending by category
    Summary {
        /// day, week, month or year
        #[arg(long, default_value = "month", conflicts_with = "all")]
        period: Period,

        /// Summarize the whole history instead of a period
        #[arg(long)]
        all: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List transactions
    List {
        #[arg(long, default_value = "month", conflicts_with = "all")]
        period: Period,

        /// List the whole history instead of a period
        #[arg(long)]
        all: bool,
    },

    /// Record a transaction (negative amount = expense)
    Add {
        description: String,

        /// "12,50" and "12.50" are both accepted
        #[arg(allow_hyphen_values = true)]
        amount: String,

        #[arg(long)]
        category: Option<String>,

        /// Local date, "YYYY-MM-DD" or "YYYY-MM-DD HH:MM" (default: now)
        #[arg(long)]
        date: Option<String>,

        /// Record as a pending future payment due on this local date
        #[arg(long)]
        due: Option<String>,
    },

    /// Pending future payments by due date
    Upcoming,

    /// Import transactions from a CSV file (date,description,amount[,category])
    Import {
        #[arg(long)]
        csv: PathBuf,
    },

    /// One-shot question to the financial assistant
    Ask {
        message: String,

        /// Limit the assistant's summary to this period
        #[arg(long)]
        period: Option<Period>,
    },

    /// Interactive chat with the financial assistant
    Chat {
        #[arg(long)]
        period: Option<Period>,
    },

    /// Assistant settings (API key, personal context)
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },

    /// Manage ~/.tally/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Shared shopping list with a budget
    Shop {
        #[command(subcommand)]
        command: ShopCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Show,
    SetApiKey { key: String },
    /// Free text about you the assistant should know (empty clears it)
    SetContext { context: String },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config.toml if none exists
    Init,
    /// Print the effective configuration
    Show,
}

#[derive(Subcommand, Debug)]
enum ShopCommand {
    New {
        title: String,
        #[arg(long)]
        budget: String,
    },
    Add {
        name: String,
        /// Unit price
        price: String,
        #[arg(long, default_value = "1")]
        qty: String,
        /// un, kg, l, ...
        #[arg(long)]
        unit: Option<String>,
        /// Add even if it goes over budget
        #[arg(long)]
        force: bool,
    },
    Remove { id: String },
    Show,
    /// Record the list as one expense and close it
    Finish,
}

static TRACING_INIT: Once = Once::new();

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("tally=info,tally_core=info,tally_store=info"));

        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let user = cli.user.as_deref();

    match cli.command {
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                let cfg = config::load_config()?;
                println!("# {}", config::config_path()?.display());
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
        },

        Command::Settings { command } => run_settings(command)?,

        Command::Summary { period, all, json } => {
            finance_cmd::summary(&open_session(user)?, (!all).then_some(period), json).await?;
        }

        Command::List { period, all } => {
            finance_cmd::list(&open_session(user)?, (!all).then_some(period)).await?;
        }

        Command::Add {
            description,
            amount,
            category,
            date,
            due,
        } => {
            let args = AddArgs {
                description: &description,
                amount: &amount,
                category: category.as_deref(),
                date: date.as_deref(),
                due: due.as_deref(),
            };
            finance_cmd::add(&open_session(user)?, args).await?;
        }

        Command::Upcoming => finance_cmd::upcoming(&open_session(user)?).await?,

        Command::Import { csv } => finance_cmd::import(&open_session(user)?, &csv).await?,

        Command::Ask { message, period } => {
            finance_cmd::ask(&open_session(user)?, &message, period).await?;
        }

        Command::Chat { period } => finance_cmd::chat(&open_session(user)?, period).await?,

        Command::Shop { command } => {
            let session = open_session(user)?;
            match command {
                ShopCommand::New { title, budget } => {
                    shop_cmd::new_list(&session, &title, &budget).await?
                }
                ShopCommand::Add {
                    name,
                    price,
                    qty,
                    unit,
                    force,
                } => {
                    let args = ItemArgs {
                        name: &name,
                        price: &price,
                        quantity: &qty,
                        unit: unit.as_deref(),
                        force,
                    };
                    shop_cmd::add_item(&session, args).await?
                }
                ShopCommand::Remove { id } => shop_cmd::remove_item(&session, &id).await?,
                ShopCommand::Show => shop_cmd::show(&session).await?,
                ShopCommand::Finish => shop_cmd::finish(&session).await?,
            }
        }
    }

    Ok(())
}

fn open_session(user: Option<&str>) -> Result<Session> {
    Session::open(config::load_config()?, user)
}

fn run_settings(command: SettingsCommand) -> Result<()> {
    let mut file = SettingsFile::open(state::settings_path()?)?;
    let mut settings = ChatSettings::load(&file)?;

    match command {
        SettingsCommand::Show => {
            println!("# {}", file.path().display());
            println!(
                "api key: {}",
                settings.api_key.as_deref().map(mask_key).unwrap_or_else(|| "(not set)".to_string())
            );
            println!(
                "personal context: {}",
                settings.personal_context.as_deref().unwrap_or("(not set)")
            );
        }
        SettingsCommand::SetApiKey { key } => {
            settings.save_api_key(&mut file, &key)?;
            println!("API key saved");
        }
        SettingsCommand::SetContext { context } => {
            settings.save_personal_context(&mut file, &context)?;
            println!("Personal context saved");
        }
    }
    Ok(())
}

/// Show only the last four characters.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("****{tail}")
}
