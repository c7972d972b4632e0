use clap::{Parser, Subcommand, builder::styling};
use eyre::Result;
use kibana_provisioner::{Provider, cli, cli::ResourceKind};
use owo_colors::OwoColorize;
use std::path::PathBuf;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// Kibana Provisioner: create, read, update and delete Kibana objects from YAML declarations
#[derive(Parser)]
#[command(name = "kibprov", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source connection settings from
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging, including response bodies
    #[arg(long, global = true)]
    debug: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test authorization to a Kibana remote
    Auth,

    /// Create an object from a YAML declaration and print its id
    Create {
        #[arg(value_enum)]
        kind: ResourceKind,

        /// YAML file declaring the object
        file: PathBuf,
    },

    /// Print the current declaration of an object as YAML
    Get {
        #[arg(value_enum)]
        kind: ResourceKind,

        /// Object id (the name for roles and spaces)
        id: String,
    },

    /// Overwrite an object with a YAML declaration
    Update {
        #[arg(value_enum)]
        kind: ResourceKind,

        /// Object id (the name for roles and spaces)
        id: String,

        /// YAML file declaring the object
        file: PathBuf,
    },

    /// Delete an object
    Delete {
        #[arg(value_enum)]
        kind: ResourceKind,

        /// Object id (the name for roles and spaces)
        id: String,
    },

    /// Find the index pattern whose title matches every filter
    FindIndex {
        /// Filters in the form "name=value1,value2"
        #[arg(short, long = "filter", required = true)]
        filters: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(e) = dotenvy::from_filename(&cli.env) {
        if !e.not_found() {
            return Err(e.into());
        }
    }

    let log_level = match cli.debug || std::env::var_os("KIBANA_DEBUG").is_some() {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    let provider = Provider::new();
    let client = cli::load_kibana_client(&provider, cli.debug).await?;

    match cli.command {
        Commands::Auth => {
            log::info!("Testing authorization to {}", client.to_string().bright_black());
            client.test_connection().await?;
            log::info!("{}", "Authorization successful".green());
        }
        Commands::Create { kind, file } => {
            log::info!(
                "Creating {:?} from {}",
                kind.cyan(),
                file.display().bright_black()
            );
            let id = cli::create(client, kind, &file).await?;
            println!("{}", id);
        }
        Commands::Get { kind, id } => match cli::read(client, kind, &id).await? {
            Some(yaml) => print!("{}", yaml),
            None => {
                log::warn!("{:?} {} does not exist", kind, id.bright_black());
                std::process::exit(1);
            }
        },
        Commands::Update { kind, id, file } => {
            log::info!(
                "Updating {:?} {} from {}",
                kind.cyan(),
                id.bright_black(),
                file.display().bright_black()
            );
            cli::update(client, kind, &id, &file).await?;
            log::info!("{}", "Updated".green());
        }
        Commands::Delete { kind, id } => {
            cli::delete(client, kind, &id).await?;
            log::info!("Deleted {:?} {}", kind.cyan(), id.bright_black());
        }
        Commands::FindIndex { filters } => {
            let index = cli::find_index(client, &filters).await?;
            print!("{}", serde_yaml::to_string(&index)?);
        }
    }

    Ok(())
}
