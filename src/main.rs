// Entrypoint for the CLI application.
// - Loads `.env`, parses flags, installs logging.
// - Builds the queue client and hands a session to the UI.

use anyhow::Context;
use clap::Parser;
use falgen_cli::{
    api::{FalQueue, GenerationClient, HttpImageFetcher},
    cli::Cli,
    config::AppConfig,
    credential::CredentialHolder,
    logging::init_logging,
    session::Session,
    ui,
};

fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = cli.apply_to_config(AppConfig::from_env());
    let transport = FalQueue::new(&config.queue_url).context("Failed to build queue client")?;
    let client = GenerationClient::new(transport, config.model.clone())
        .with_poll_interval(config.poll_interval);
    let fetcher = HttpImageFetcher::new().context("Failed to build image client")?;

    let session = Session::new(
        CredentialHolder::from_env_value(config.api_key.clone()),
        cli.initial_params(),
    )
    .with_spinner(true);

    if cli.is_one_shot() {
        ui::run_once(session, &client, &fetcher, cli.save.as_deref())
    } else {
        ui::main_menu(session, &client, &fetcher)
    }
}
