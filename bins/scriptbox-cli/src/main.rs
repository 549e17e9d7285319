mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use scriptbox_common::EngineConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scriptbox")]
#[command(about = "Scriptbox - run JavaScript, TypeScript and Python snippets in a sandbox", long_about = None)]
struct Cli {
    /// Engine config file (defaults to config/engine.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the per-execution timeout
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Emit logs as JSON
    #[arg(long, global = true, default_value = "false")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// Read the code from a file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Pass the code inline
    #[arg(short, long)]
    code: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a snippet once and print its output
    Run {
        /// Language tag (javascript, typescript, python, html)
        #[arg(short, long)]
        language: String,

        #[command(flatten)]
        source: SourceArgs,

        /// Input text made available to the snippet
        #[arg(short, long, conflicts_with = "input_file")]
        input: Option<String>,

        /// Read the input text from a file
        #[arg(long)]
        input_file: Option<PathBuf>,

        /// Print the full result as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Run a snippet against a JSON file of test cases
    Test {
        /// Language tag
        #[arg(short, long)]
        language: String,

        /// Source file under test
        #[arg(short, long)]
        file: PathBuf,

        /// JSON array of test cases
        #[arg(long)]
        cases: PathBuf,

        /// Print the suite result as JSON
        #[arg(long, default_value = "false")]
        json: bool,

        /// Also show details of hidden test cases
        #[arg(long, default_value = "false")]
        show_hidden: bool,
    },

    /// Print the JavaScript produced from a TypeScript file
    Transform {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List supported language tags
    Languages,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&PathBuf>, timeout_ms: Option<u64>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::load_default()?,
    }
    .apply_env_overrides();

    let config = match timeout_ms {
        Some(timeout_ms) => config.with_timeout_ms(timeout_ms),
        None => config,
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Run {
            language,
            source,
            input,
            input_file,
            json,
        } => {
            let config = load_config(cli.config.as_ref(), cli.timeout_ms)?;
            let code = commands::read_source(source.file.as_deref(), source.code)?;
            let input = commands::read_input(input, input_file.as_deref())?;
            commands::run(config, &code, &language, &input, json).await?;
        }
        Commands::Test {
            language,
            file,
            cases,
            json,
            show_hidden,
        } => {
            let config = load_config(cli.config.as_ref(), cli.timeout_ms)?;
            let all_passed = commands::test(config, &file, &language, &cases, json, show_hidden).await?;
            if !all_passed {
                std::process::exit(1);
            }
        }
        Commands::Transform { file } => {
            commands::transform(&file)?;
        }
        Commands::Languages => {
            commands::languages();
        }
    }

    Ok(())
}
