use anyhow::Context;
use clap::Parser;
use distrib_exec::cli::Cli;
use distrib_exec::config::{load_config, AppConfig};
use distrib_exec::gate::RunContext;
use distrib_exec::orchestrator::{RunOrchestrator, RunOutcome};
use distrib_exec::rpc::WampClient;
use distrib_exec::storage::StorageFactory;
use distrib_exec::{logging, DistribError};
use tracing::{debug, error, info, trace};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = load_app_config(&cli);
    let log_file = config.as_ref().ok().and_then(|c| c.log_file.clone());
    if let Err(e) = logging::init(cli.verbose, log_file.as_deref()) {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }

    debug!(
        "distrib-exec {} started with verbosity level: {}",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = match config {
        Ok(config) => run(&cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        let code = e
            .downcast_ref::<DistribError>()
            .map(DistribError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn load_app_config(cli: &Cli) -> distrib_exec::Result<AppConfig> {
    let mut config = load_config(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    config.validate()?;
    Ok(config)
}

async fn run(cli: &Cli, config: AppConfig) -> anyhow::Result<()> {
    if cli.show_data {
        let payload = config
            .request
            .to_json()
            .context("Failed to serialize routing payload")?;
        println!("Data: {payload}");
        return Ok(());
    }

    debug!(
        "Routing payload: {}",
        config.request.redacted().to_json().unwrap_or_default()
    );

    let today = cli.run_date();
    let suffix = config.request.dist_suffix.clone();
    let ctx = if cli.manual_run {
        RunContext::manual(today, suffix)
    } else {
        RunContext::scheduled(today, suffix)
    };

    let store = StorageFactory::from_config(&config.storage)
        .await
        .map_err(|e| DistribError::store_unavailable("opening store", e))?;
    let rpc = WampClient::from_config(&config.router);
    info!(
        "Routing through {} realm {}",
        config.router.url, config.router.realm
    );

    match RunOrchestrator::new(store.as_ref(), &rpc)
        .run(&ctx, &config.request)
        .await?
    {
        RunOutcome::Blocked(admission) => info!("Nothing to do, run {}", admission),
        RunOutcome::NoEligibleData => info!("No eligible orders, routing skipped"),
        RunOutcome::Dispatched {
            active,
            deferred,
            response,
        } => {
            info!(
                "Routing dispatched with {} active and {} deferred orders",
                active, deferred
            );
            println!("{response}");
        }
    }

    Ok(())
}
