//! 🚀 xfy-cli: the front door. Tracking logs knock, statements leave.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary crate loads config, sets up logging, lets `--input` / `--output`
//! override the configured source and sink, and then gets out of the way. Like a good
//! manager. 🦆
//!
//! ⚠️ Logs go to stderr. Stdout belongs to the statements when no output file is given.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;
use xfy::app_config::{FileSinkConfig, FileSourceConfig, SinkConfig, SourceConfig};

/// 🎓 Convert edX tracking logs into xAPI statements, one JSON object per line.
#[derive(Debug, Parser)]
#[command(name = "xfy", version)]
struct Args {
    /// 🔧 TOML config file, merged over `XFY_*` environment variables
    #[arg(short, long, default_value = "xfy.toml")]
    config: PathBuf,

    /// 🚰 tracking log file to read (`.gz` is fine), instead of the configured source
    #[arg(short, long)]
    input: Option<String>,

    /// 🕳️ file to write statements to, instead of the configured sink
    #[arg(short, long)]
    output: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 📡 stderr, always. stdout might be carrying the actual payload.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // 🔒 A missing config file is fine, env vars may carry everything. An unreadable path is not.
    let config_file = args
        .config
        .try_exists()
        .context(format!(
            "💀 Could not check whether the config file exists. Was checking here: '{}'",
            args.config.display()
        ))?
        .then_some(args.config.as_path());

    let mut app_config = xfy::load_config(config_file).context(
        "💀 In xfy-cli, main, we couldn't load the config. The xapi section (platform_url at \
         the very least) has to come from the file or from XFY_XAPI__* variables.",
    )?;

    if let Some(input) = args.input {
        app_config.source_config = SourceConfig::File(FileSourceConfig::new(input));
    }
    if let Some(output) = args.output {
        app_config.sink_config = SinkConfig::File(FileSinkConfig::new(output));
    }

    // 🚀 SEND IT.
    match xfy::run(app_config).await {
        Ok(report) => {
            eprintln!("{}", report.to_table());
            Ok(())
        }
        Err(err) => {
            error!("💀 error: {}", err);
            // -- 🧅 peel the onion, one layer at a time
            for cause in err.chain().skip(1) {
                error!("⚠️  cause: {}", cause);
            }
            std::process::exit(1);
        }
    }
}
