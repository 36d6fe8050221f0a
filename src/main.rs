//! fastgcs - read Google Cloud Storage objects through the local cache

use anyhow::{anyhow, Result};
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use fastgcs::FastGcs;

/// CLI command
#[derive(Debug)]
enum Command {
    /// Write object bytes to stdout
    Cat { gs_url: String },
    /// Copy object to a local path
    Cp { gs_url: String, dest: PathBuf },
    /// Print the cached file's path
    Path { gs_url: String },
    /// Show help
    Help,
}

fn print_help() {
    eprintln!(
        r#"fastgcs - Read Google Cloud Storage objects through a local cache

USAGE:
    fastgcs cat <gs://bucket/key>
    fastgcs cp <gs://bucket/key> <dest>
    fastgcs path <gs://bucket/key>
    fastgcs help

COMMANDS:
    cat     Write the object's bytes to stdout
    cp      Copy the object to a local file
    path    Print the path of the locally cached copy
    help    Show this help message

ENVIRONMENT:
    FASTGCS_CACHE_DIR     Object cache directory (default: platform cache dir)
    CLOUDSDK_CONFIG       Cloud SDK config directory (default: ~/.config/gcloud)
    FASTGCS_STORAGE_URL   Storage API base URL
    FASTGCS_TOKEN_URL     OAuth2 token endpoint
    RUST_LOG              Log level (trace, debug, info, warn, error)
"#
    );
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("cat") if args.len() == 3 => Ok(Command::Cat {
            gs_url: args[2].clone(),
        }),
        Some("cp") if args.len() == 4 => Ok(Command::Cp {
            gs_url: args[2].clone(),
            dest: PathBuf::from(&args[3]),
        }),
        Some("path") if args.len() == 3 => Ok(Command::Path {
            gs_url: args[2].clone(),
        }),
        Some("help" | "--help" | "-h") => Ok(Command::Help),
        Some(other) => Err(anyhow!("Unknown command or wrong arguments: {}", other)),
        None => Err(anyhow!("No command given")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `cat` output stays clean
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let command = match parse_args() {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    match command {
        Command::Help => print_help(),
        command => run(command).await?,
    }

    Ok(())
}

async fn run(command: Command) -> Result<()> {
    let fg = FastGcs::from_env()?;

    match command {
        Command::Cat { gs_url } => {
            let data = fg.read(&gs_url).await?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&data)?;
            stdout.flush()?;
        }
        Command::Cp { gs_url, dest } => {
            fg.copy(&gs_url, &dest).await?;
        }
        Command::Path { gs_url } => {
            let path = fg.materialize(&gs_url).await?;
            println!("{}", path.display());
        }
        Command::Help => print_help(),
    }

    fg.log_metrics();
    debug!("Done");
    Ok(())
}
