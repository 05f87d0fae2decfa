//! slos -- command-line front end for Swift-compatible object storage.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use sl_objectstorage::config::{load_config, Config};
use sl_objectstorage::{Account, SearchQuery, Session};

/// Command-line arguments for slos.
#[derive(Parser, Debug)]
#[command(name = "slos", version, about = "Object storage client")]
struct Cli {
    /// Path to a YAML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the endpoint base URL.
    #[arg(long, env = "SLOS_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Override the account user.
    #[arg(long, env = "SLOS_USERNAME", global = true)]
    username: Option<String>,

    /// Override the API key.
    #[arg(long, env = "SLOS_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List containers
    Containers {
        /// Only CDN-enabled containers
        #[arg(long, default_value_t = false)]
        cdn: bool,
    },
    /// Create a container
    Create { container: String },
    /// Remove an empty container
    RemoveContainer { container: String },
    /// List the objects in a container
    Objects { container: String },
    /// Upload a local file
    Upload {
        container: String,
        file: PathBuf,
        /// Object name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Metadata tag as key=value; repeatable
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<(String, String)>,
    },
    /// Download an object
    Download {
        container: String,
        object: String,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Remove an object
    Remove { container: String, object: String },
    /// Server-side copy of an object
    Copy {
        src_container: String,
        src_object: String,
        dst_container: String,
        dst_object: String,
    },
    /// Show the account's CDN base URLs
    CdnUrls,
    /// CDN management
    Cdn {
        #[command(subcommand)]
        command: CdnCommands,
    },
    /// Search the account
    Search {
        query: String,
        #[arg(long)]
        limit: Option<u64>,
        #[arg(long)]
        start: Option<u64>,
        #[arg(long)]
        field: Option<String>,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        format: Option<String>,
        #[arg(long)]
        marker: Option<String>,
        #[arg(long, default_value_t = false)]
        recursive: bool,
    },
}

#[derive(Subcommand, Debug)]
enum CdnCommands {
    /// Enable CDN delivery for a container
    Enable {
        container: String,
        #[arg(long)]
        ttl: Option<u32>,
    },
    /// Disable CDN delivery for a container
    Disable { container: String },
    /// Change the CDN TTL of a container
    Ttl { container: String, ttl: u32 },
    /// Purge a container, or one object, from the CDN
    Purge {
        container: String,
        object: Option<String>,
    },
}

fn parse_tag(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match cli.config {
        Some(ref path) => load_config(path)?,
        None => Config::default(),
    };
    if let Some(ref base_url) = cli.base_url {
        config.endpoint.base_url = base_url.clone();
    }
    if let Some(ref username) = cli.username {
        config.auth.username = username.clone();
    }
    if let Some(ref api_key) = cli.api_key {
        config.auth.api_key = api_key.clone();
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    init_tracing(&config);
    sl_objectstorage::metrics::describe_metrics();

    if config.auth.username.is_empty() {
        anyhow::bail!("no username configured (use --username or SLOS_USERNAME)");
    }

    let session = Session::from_config(&config)?;
    let mut account = Account::new(session)
        .with_context(|| format!("cannot authenticate against {}", config.endpoint.base_url))?;
    run(cli.command, &mut account)
}

fn run(command: Commands, account: &mut Account) -> anyhow::Result<()> {
    match command {
        Commands::Containers { cdn } => {
            let containers = if cdn {
                account.list_cdn_containers()?
            } else {
                account.list_containers()?
            };
            for container in containers {
                println!("{}", container.name());
            }
        }
        Commands::Create { container } => {
            account.container(container).create(account.session_mut())?;
        }
        Commands::RemoveContainer { container } => {
            account.container(container).remove(account.session_mut())?;
        }
        Commands::Objects { container } => {
            let objects = account
                .container(container)
                .list_objects(account.session_mut())?;
            for object in objects {
                println!("{}", object.name());
            }
        }
        Commands::Upload {
            container,
            file,
            name,
            tags,
        } => {
            let name = match name {
                Some(name) => name,
                None => file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .with_context(|| format!("cannot derive an object name from {}", file.display()))?,
            };
            let tags: BTreeMap<String, String> = tags.into_iter().collect();
            let object = account.container(container).object(name);
            let etag = object.upload_file(account.session_mut(), &file, &tags)?;
            info!("uploaded {} to {}/{}", file.display(), object.container(), object.name());
            if let Some(etag) = etag {
                println!("{etag}");
            }
        }
        Commands::Download {
            container,
            object,
            output,
        } => {
            let data = account
                .container(container)
                .object(object)
                .fetch(account.session_mut())?;
            match output {
                Some(path) => std::fs::write(&path, &data.bytes)
                    .with_context(|| format!("cannot write {}", path.display()))?,
                None => std::io::stdout().lock().write_all(&data.bytes)?,
            }
        }
        Commands::Remove { container, object } => {
            account
                .container(container)
                .object(object)
                .remove(account.session_mut())?;
        }
        Commands::Copy {
            src_container,
            src_object,
            dst_container,
            dst_object,
        } => {
            account
                .container(dst_container)
                .object(dst_object)
                .copy_from(account.session_mut(), &src_container, &src_object)?;
        }
        Commands::CdnUrls => {
            let urls = account.cdn_urls()?;
            let show = |label: &str, value: Option<String>| {
                println!("{label}: {}", value.as_deref().unwrap_or("-"));
            };
            show("http", urls.http);
            show("ssl", urls.ssl);
            show("stream-http", urls.stream_http);
            show("stream-flash", urls.stream_flash);
        }
        Commands::Cdn { command } => run_cdn(command, account)?,
        Commands::Search {
            query,
            limit,
            start,
            field,
            kind,
            format,
            marker,
            recursive,
        } => {
            let query = SearchQuery {
                query,
                limit,
                start,
                field,
                kind,
                format,
                marker,
                recursive,
            };
            println!("{}", account.search(&query)?);
        }
    }
    Ok(())
}

fn run_cdn(command: CdnCommands, account: &mut Account) -> anyhow::Result<()> {
    match command {
        CdnCommands::Enable { container, ttl } => {
            account
                .container(container)
                .enable_cdn(account.session_mut(), ttl)?;
        }
        CdnCommands::Disable { container } => {
            account.container(container).disable_cdn(account.session_mut())?;
        }
        CdnCommands::Ttl { container, ttl } => {
            account
                .container(container)
                .update_cdn_ttl(account.session_mut(), ttl)?;
        }
        CdnCommands::Purge { container, object } => {
            let container = account.container(container);
            match object {
                Some(object) => container.object(object).purge_cdn(account.session_mut())?,
                None => container.purge_cdn(account.session_mut())?,
            }
        }
    }
    Ok(())
}
