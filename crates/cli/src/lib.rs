pub mod commands;

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use chinook_core::NewCustomer;
use clap::{Args, CommandFactory, Parser, Subcommand};

use crate::commands::{CommandResult, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "chinook",
    about = "Chinook customer store CLI",
    long_about = "Manage Chinook customers and run the customer reporting queries against a SQLite database.",
    after_help = "Examples:\n  chinook init\n  chinook add --first-name Ana --last-name Diaz --email ana@x.com\n  chinook search ana\n  chinook getpaged 10 20 --json\n  chinook populargenres 12"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a chinook.toml config file")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "SQLite database URL (overrides config and env)")]
    pub database_url: Option<String>,
    #[arg(long, global = true, help = "Emit machine-readable JSON output")]
    pub json: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    #[command(about = "Create the database file and Customer table when missing")]
    Init,
    #[command(about = "Insert a customer and print its new id")]
    Add(CustomerFields),
    #[command(about = "Overwrite the given fields of an existing customer")]
    Update {
        id: i64,
        #[command(flatten)]
        fields: CustomerFields,
    },
    #[command(about = "Delete a customer (missing ids are ignored)")]
    Delete { id: i64 },
    #[command(about = "Find one customer whose first or last name contains the text")]
    Search { name: String },
    #[command(about = "List every customer")]
    List,
    #[command(name = "getbyid", about = "Show one customer by id")]
    GetById { id: i64 },
    #[command(name = "getbyemail", about = "Show one customer by exact email")]
    GetByEmail { email: String },
    #[command(name = "getpaged", about = "List customers ordered by id, one page at a time")]
    GetPaged {
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        limit: u32,
        offset: u32,
    },
    #[command(name = "countbycountry", about = "Count customers per country, largest first")]
    CountByCountry,
    #[command(name = "highspenders", about = "Rank customers by invoice total, largest first")]
    HighSpenders,
    #[command(
        name = "populargenres",
        about = "Show the genre(s) a customer bought the most tracks of"
    )]
    PopularGenres { customer_id: i64 },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Add(_) => "add",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Search { .. } => "search",
            Self::List => "list",
            Self::GetById { .. } => "getbyid",
            Self::GetByEmail { .. } => "getbyemail",
            Self::GetPaged { .. } => "getpaged",
            Self::CountByCountry => "countbycountry",
            Self::HighSpenders => "highspenders",
            Self::PopularGenres { .. } => "populargenres",
        }
    }
}

#[derive(Clone, Debug, Default, Args)]
pub struct CustomerFields {
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub postal_code: Option<String>,
}

impl CustomerFields {
    /// Unset flags become empty strings.
    pub fn to_new_customer(&self) -> NewCustomer {
        self.merge_into(NewCustomer::default())
    }

    /// Replaces only the fields that were given on the command line.
    pub fn merge_into(&self, mut base: NewCustomer) -> NewCustomer {
        let pairs = [
            (&self.first_name, &mut base.first_name),
            (&self.last_name, &mut base.last_name),
            (&self.email, &mut base.email),
            (&self.phone, &mut base.phone),
            (&self.country, &mut base.country),
            (&self.postal_code, &mut base.postal_code),
        ];
        for (given, slot) in pairs {
            if let Some(value) = given {
                slot.clone_from(value);
            }
        }
        base
    }
}

pub fn run() -> ExitCode {
    let result = run_from(std::env::args_os());
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Parses `args` (program name first) and executes the command.
///
/// Usage problems, including no subcommand at all, print help and succeed.
/// With `--json` anywhere in `args` they are reported as a JSON payload.
pub fn run_from<I, T>(args: I) -> CommandResult
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let format = if args.iter().skip(1).any(|arg| arg == "--json") {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match Cli::try_parse_from(&args) {
        Ok(cli) => execute(cli),
        Err(error) => {
            CommandResult::usage(error.render().to_string(), error.use_stderr(), format)
        }
    }
}

pub fn execute(cli: Cli) -> CommandResult {
    let format = if cli.json { OutputFormat::Json } else { OutputFormat::Text };
    let Some(command) = cli.command.clone() else {
        return CommandResult::usage(Cli::command().render_help().to_string(), false, format);
    };
    commands::run(&cli, &command, format)
}
