use clap::Parser;
use color_eyre::Result;
use sentry_exporter::{
    init_errors,
    init_logging,
    App,
    Args,
    Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    let args = Args::parse();
    let config = Config::new(&args)?;
    init_logging(config.log_level, config.log_format)?;
    App::new(config).run(args.command).await
}
