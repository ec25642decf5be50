mod driver;

use driver::{Driver, RunOutcome};
use eraser_core::{ConfigError, CoreError, EraserConfig, ErrorExt, ErrorReporter};
use reddit_client::{Authenticator, DeleterConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "reddit_eraser=info,reddit_client=info";

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Application error: {:#}", e);
            println!("An error occurred: {:#}", e);
            1
        }
    };
    // Exit explicitly so a stdin read still parked on the blocking pool
    // does not hold the runtime open.
    std::process::exit(code);
}

async fn run() -> anyhow::Result<i32> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    tracing::info!("Starting Reddit Eraser");

    let config = match EraserConfig::from_env() {
        Ok(config) => config,
        Err(ConfigError::MissingEnvironmentVariables { names }) => {
            println!("Error: Missing required environment variables:");
            for name in &names {
                println!("- {}", name);
            }
            println!("\nPlease check your .env file and make sure these variables are set.");
            return Ok(1);
        }
        Err(e) => {
            println!("Error: {}", e.user_friendly_message());
            return Ok(1);
        }
    };

    let cancel = CancellationToken::new();
    let handle = cancel.clone();
    spawn_interrupt_watcher(handle);

    let reporter = ErrorReporter::new();
    let authenticator = Authenticator::new(&config)?;
    let session = match authenticator.authenticate(&cancel).await {
        Ok(session) => session,
        Err(CoreError::Cancelled) => {
            println!("\nAuthorization cancelled by user.");
            return Ok(0);
        }
        Err(e) => {
            reporter.report_error(&e);
            println!("An error occurred: {}", e);
            return Ok(1);
        }
    };

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let outcome = Driver::new(&session, stdin, std::io::stdout(), cancel)
        .with_deleter_config(DeleterConfig::default().with_delay(config.delete_delay))
        .with_limit(config.delete_limit)
        .run()
        .await;

    match outcome {
        Ok(RunOutcome::Finished(reports)) | Ok(RunOutcome::Cancelled(reports)) => {
            tracing::info!(
                "Run finished: {} items deleted, {} failed",
                reports.iter().map(|r| r.deleted).sum::<usize>(),
                reports.iter().map(|r| r.failed).sum::<usize>()
            );
            Ok(0)
        }
        Ok(RunOutcome::InvalidChoice) | Ok(RunOutcome::Declined) => Ok(0),
        Err(e) => {
            reporter.report_error(&e);
            println!("An error occurred: {}", e);
            Ok(1)
        }
    }
}

/// First Ctrl-C asks the run to stop, a second one ends the process.
fn spawn_interrupt_watcher(handle: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Interrupt received, stopping after the current step");
        println!("\nStopping... press Ctrl-C again to exit immediately.");
        handle.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}
