pub mod customer;
pub mod init;
pub mod report;

use anyhow::Context;
use chinook_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use chinook_core::ApplicationError;
use chinook_db::{CustomerStore, InitializedSchema, SchemaInitializer, SqlCustomerRepository};
use serde::Serialize;
use serde_json::Value;

use crate::{Cli, Command};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// What a command produced before rendering.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub message: String,
    pub lines: Vec<String>,
    pub data: Option<Value>,
}

impl CommandOutput {
    pub fn message(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Self::default() }
    }

    pub fn with_lines(mut self, lines: Vec<String>) -> Self {
        self.lines = lines;
        self
    }

    /// A value that cannot be represented as JSON is logged and left out.
    pub fn with_data<T: Serialize>(mut self, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => self.data = Some(value),
            Err(error) => {
                tracing::warn!(
                    event_name = "cli.output.serialize_failed",
                    message = %self.message,
                    error = %error,
                    "command data could not be serialized"
                );
            }
        }
        self
    }
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, output: CommandOutput, format: OutputFormat) -> Self {
        let rendered = match format {
            OutputFormat::Text => {
                let mut text = output.message;
                for line in output.lines {
                    text.push('\n');
                    text.push_str(&line);
                }
                text
            }
            OutputFormat::Json => serialize_payload(CommandOutcome {
                command: command.to_string(),
                status: "ok".to_string(),
                error_class: None,
                message: output.message,
                data: output.data,
            }),
        };
        Self { exit_code: 0, output: rendered }
    }

    pub fn failure(command: &str, error: &ApplicationError, format: OutputFormat) -> Self {
        let exit_code = if error.is_fatal() { 1 } else { 0 };
        let rendered = match format {
            OutputFormat::Text => format!("error: {error}"),
            OutputFormat::Json => serialize_payload(CommandOutcome {
                command: command.to_string(),
                status: "error".to_string(),
                error_class: Some(error.error_class().to_string()),
                message: error.to_string(),
                data: None,
            }),
        };
        Self { exit_code, output: rendered }
    }

    /// clap's rendered usage, help or parse error. Always exits 0.
    pub fn usage(rendered: String, is_error: bool, format: OutputFormat) -> Self {
        let output = match format {
            OutputFormat::Text => rendered,
            OutputFormat::Json => serialize_payload(CommandOutcome {
                command: "chinook".to_string(),
                status: if is_error { "error" } else { "ok" }.to_string(),
                error_class: is_error.then(|| "usage".to_string()),
                message: rendered.trim_end().to_string(),
                data: None,
            }),
        };
        Self { exit_code: 0, output }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Loads config, initializes the schema and runs one command to completion.
pub fn run(cli: &Cli, command: &Command, format: OutputFormat) -> CommandResult {
    let name = command.name();
    let options = LoadOptions {
        config_path: cli.config.clone(),
        require_file: cli.config.is_some(),
        overrides: ConfigOverrides { database_url: cli.database_url.clone(), log_level: None },
    };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            let error = ApplicationError::Configuration(error.to_string());
            return CommandResult::failure(name, &error, format);
        }
    };
    init_logging(&config);

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            let error = ApplicationError::Initialization(format!("{error:#}"));
            return CommandResult::failure(name, &error, format);
        }
    };

    let outcome = runtime.block_on(async {
        let schema = open_schema(&config).await?;
        let store = SqlCustomerRepository::new(&schema);
        let outcome = match command {
            Command::Init => Ok(init::run(&schema)),
            other => dispatch(other, &store).await,
        };
        schema.pool().close().await;
        outcome
    });

    match outcome {
        Ok(output) => CommandResult::success(name, output, format),
        Err(error) => {
            tracing::warn!(
                event_name = "cli.command.failed",
                command = name,
                error_class = error.error_class(),
                error = %error,
                "command failed"
            );
            CommandResult::failure(name, &error, format)
        }
    }
}

/// Runs a data command against any store. `init` has no store-level meaning
/// and reports success.
pub async fn dispatch(
    command: &Command,
    store: &dyn CustomerStore,
) -> Result<CommandOutput, ApplicationError> {
    match command {
        Command::Init => Ok(CommandOutput::message("schema ready")),
        Command::Add(fields) => customer::add(store, fields).await,
        Command::Update { id, fields } => customer::update(store, *id, fields).await,
        Command::Delete { id } => customer::delete(store, *id).await,
        Command::Search { name } => customer::search(store, name).await,
        Command::List => customer::list(store).await,
        Command::GetById { id } => customer::get_by_id(store, *id).await,
        Command::GetByEmail { email } => customer::get_by_email(store, email).await,
        Command::GetPaged { limit, offset } => customer::get_paged(store, *limit, *offset).await,
        Command::CountByCountry => report::count_by_country(store).await,
        Command::HighSpenders => report::high_spenders(store).await,
        Command::PopularGenres { customer_id } => {
            report::popular_genres(store, *customer_id).await
        }
    }
}

async fn open_schema(config: &AppConfig) -> Result<InitializedSchema, ApplicationError> {
    SchemaInitializer::new(config.database.url.clone())
        .with_pool_settings(config.database.max_connections, config.database.timeout_secs)
        .ensure_initialized()
        .await
        .map_err(|error| ApplicationError::Initialization(error.to_string()))
}

fn build_runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")
}

/// Logs go to stderr so stdout carries only command output. Repeated calls
/// keep the first subscriber.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::WARN);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
