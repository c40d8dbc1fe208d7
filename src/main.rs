use std::{path::PathBuf, sync::Arc, time::Duration};

use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use crossterm::event::EventStream;
use ratatui::DefaultTerminal;
use tokio_stream::StreamExt;

use cirrus::{
    app::App,
    aws,
    config::ConfigStore,
    dynamodb::DynamoStore,
    env::{Effect, Env, Message},
    logging,
    logs::{CloudWatchStore, SearchTool},
    widgets::{KvBrowser, LogBrowser},
};

mod subcommands;

#[derive(clap::Parser)]
#[command(
    name = "cirrus",
    version,
    about = "Browse DynamoDB tables and tail CloudWatch logs from the terminal",
    long_about = None
)]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to the preferences file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Endpoint URL for the DynamoDB service
    #[arg(long, global = true)]
    endpoint_url: Option<String>,

    /// Only show tables whose name starts with this prefix, such as
    /// `dev-cot`. Every table is listed when empty
    #[arg(long, global = true, default_value = "")]
    table_prefix: String,

    /// Only list log groups whose name contains this pattern, such as
    /// `dev-cot`. Every log group is listed when unset
    #[arg(long)]
    log_group_pattern: Option<String>,

    /// Program used to search log output
    #[arg(long, default_value = "rg")]
    search_tool: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Print table names and exit
    ListTables {
        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| eyre!("a rustls crypto provider is already installed"))?;

    color_eyre::install()?;
    let cli = <Cli as clap::Parser>::parse();
    let _guard = logging::init(cli.verbose)?;

    match cli.command {
        Some(Commands::ListTables { json }) => {
            let client = aws::new_dynamodb_client(cli.endpoint_url.as_deref()).await?;
            let options = subcommands::list_tables::Options {
                json,
                prefix: cli.table_prefix,
            };
            subcommands::list_tables::command(&DynamoStore::new(client), options).await
        }
        None => run_tui(cli).await,
    }
}

const FRAMES_PER_SECOND: f32 = 60.0;

async fn run_tui(cli: Cli) -> Result<()> {
    let config = match cli.config {
        Some(path) => ConfigStore::at(path),
        None => ConfigStore::default_location()?,
    };
    let preferences = config
        .load()
        .wrap_err_with(|| format!("loading preferences from {}", config.path().display()))?;
    let clients = aws::new_clients(cli.endpoint_url.as_deref()).await?;
    tracing::info!(
        table_prefix = %cli.table_prefix,
        search_tool = %cli.search_tool,
        "Starting"
    );

    let env = Env::new(
        Arc::new(DynamoStore::new(clients.dynamodb)),
        Arc::new(CloudWatchStore::new(clients.logs)),
        SearchTool::from_program(&cli.search_tool),
    );
    let app = App::new(
        KvBrowser::new(config, preferences, cli.table_prefix),
        LogBrowser::new(cli.log_group_pattern),
    );

    let terminal = ratatui::init();
    let result = run(terminal, app, env).await;
    ratatui::restore();
    result
}

async fn run(mut terminal: DefaultTerminal, mut app: App, mut env: Env) -> Result<()> {
    let size = terminal.size()?;
    app.resize(size.width, size.height);

    let period = Duration::from_secs_f32(1.0 / FRAMES_PER_SECOND);
    let mut interval = tokio::time::interval(period);
    let mut events = EventStream::new();

    loop {
        let message = tokio::select! {
            _ = interval.tick() => {
                app.tick();
                terminal.draw(|frame| app.render(frame))?;
                continue;
            },
            Some(Ok(event)) = events.next() => Message::Input(event),
            Some(message) = env.rx().recv() => message,
        };
        let mut quit = false;
        for effect in app.dispatch(message) {
            match effect {
                Effect::Quit => quit = true,
                other => env.execute(other),
            }
        }
        if quit {
            terminal.draw(|frame| app.render(frame))?;
            tracing::info!("Quitting");
            return Ok(());
        }
    }
}
