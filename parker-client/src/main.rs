// Parker CLI: find nearby spots, report open spots, manage an account.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use parker_client::location::event_channel;
use parker_client::{
    config, ClientConfig, FixedLocationProvider, HttpSpotRepository, ReqwestTransport,
    SpotRepository, SyncDriver,
};
use parker_core::{
    format_distance, marker_state_now, rank_by_distance, Coordinate, SessionSnapshot,
};
use serde_json::json;
use tokio::sync::watch;

/// Extra time allowed on top of the request timeout for the location round trip.
const LOCATION_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "parker", version, about = "Find, check and report street parking")]
struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Copy)]
struct Position {
    #[arg(long, allow_negative_numbers = true, requires = "lon")]
    lat: Option<f64>,
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    lon: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List spots near a position, nearest first, with their current legality.
    Spots {
        #[command(flatten)]
        at: Position,
    },
    /// Report that the spot nearest a position is open.
    Report {
        #[command(flatten)]
        at: Position,
    },
    /// Push a status update for the spot nearest a position.
    UpdateStatus {
        #[command(flatten)]
        at: Position,
    },
    Signup {
        phone: String,
        passcode: String,
    },
    Login {
        phone: String,
        passcode: String,
    },
}

type Driver = SyncDriver<HttpSpotRepository<ReqwestTransport>, FixedLocationProvider>;

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = config::load();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli, cfg))
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn run(cli: Cli, cfg: ClientConfig) -> anyhow::Result<()> {
    let transport = ReqwestTransport::new(cfg.api_base_url.clone(), cfg.request_timeout())
        .context("building HTTP client")?;
    let repository = Arc::new(HttpSpotRepository::new(transport));

    match cli.command {
        Commands::Spots { at } => {
            let (_driver, mut snapshots) = start_session(&cfg, repository, at).await;
            let snap = wait_until(&mut snapshots, &cfg, |s| s.fetch_generation >= 1).await?;
            print_spots(&snap, cli.json);
        }
        Commands::Report { at } => {
            let (driver, mut snapshots) = start_session(&cfg, repository, at).await;
            wait_until(&mut snapshots, &cfg, |s| s.current_location.is_some()).await?;
            driver.report_availability().await?;
            print_ok(cli.json, "report submitted");
        }
        Commands::UpdateStatus { at } => {
            let (driver, mut snapshots) = start_session(&cfg, repository, at).await;
            wait_until(&mut snapshots, &cfg, |s| s.current_location.is_some()).await?;
            driver.update_spot_status().await?;
            print_ok(cli.json, "status updated");
        }
        Commands::Signup { phone, passcode } => {
            let result = repository.sign_up(&phone, &passcode).await?;
            print_auth(cli.json, "sign-up", result.success, result.credits)?;
        }
        Commands::Login { phone, passcode } => {
            let result = repository.login(&phone, &passcode).await?;
            print_auth(cli.json, "login", result.success, result.credits)?;
        }
    }
    Ok(())
}

/// Spin up a driver whose location provider answers with `at` (or the configured default)
/// and ask it for a fix. On return the seeded location has been cleared.
async fn start_session(
    cfg: &ClientConfig,
    repository: Arc<HttpSpotRepository<ReqwestTransport>>,
    at: Position,
) -> (Driver, watch::Receiver<SessionSnapshot>) {
    let position = match (at.lat, at.lon) {
        (Some(lat), Some(lon)) => Coordinate::new(lat, lon),
        _ => cfg.default_center(),
    };
    let (tx, rx) = event_channel();
    let provider = Arc::new(FixedLocationProvider::authorized(position, tx));
    let driver = SyncDriver::new(repository, provider, cfg.default_center(), cfg.search_limit);
    let snapshots = driver.subscribe();
    driver.spawn(rx);
    driver.request_location().await;
    (driver, snapshots)
}

async fn wait_until(
    snapshots: &mut watch::Receiver<SessionSnapshot>,
    cfg: &ClientConfig,
    ready: impl FnMut(&SessionSnapshot) -> bool,
) -> anyhow::Result<SessionSnapshot> {
    let limit = cfg.request_timeout() + LOCATION_GRACE;
    let snap = tokio::time::timeout(limit, snapshots.wait_for(ready))
        .await
        .map_err(|_| anyhow!("timed out after {}s waiting for the session", limit.as_secs()))?
        .context("session closed")?
        .clone();
    if let Some(err) = &snap.last_location_error {
        return Err(anyhow!("location unavailable: {err}"));
    }
    Ok(snap)
}

fn print_spots(snap: &SessionSnapshot, as_json: bool) {
    let Some(origin) = snap.current_location else {
        return;
    };
    let ranked = rank_by_distance(&snap.spots, origin);
    if as_json {
        let rows: Vec<_> = ranked
            .iter()
            .map(|(s, d)| {
                json!({
                    "id": s.id,
                    "label": s.label,
                    "status": s.status.as_str(),
                    "marker": format!("{:?}", marker_state_now(s)).to_lowercase(),
                    "distance_m": d.round(),
                })
            })
            .collect();
        println!("{}", json!(rows));
        return;
    }
    if ranked.is_empty() {
        // Search failures and empty areas look the same from here.
        println!("No spot data available near {:.4}, {:.4}", origin.latitude, origin.longitude);
        return;
    }
    for (spot, meters) in ranked {
        println!(
            "{:<10} {:<28} {:>8}  {:?}",
            spot.id,
            spot.label,
            format_distance(meters),
            marker_state_now(spot)
        );
    }
}

fn print_ok(as_json: bool, message: &str) {
    if as_json {
        println!("{}", json!({ "ok": true, "message": message }));
    } else {
        println!("{message}");
    }
}

fn print_auth(
    as_json: bool,
    what: &str,
    success: bool,
    credits: Option<i64>,
) -> anyhow::Result<()> {
    if as_json {
        println!("{}", json!({ "success": success, "credits": credits }));
    }
    if !success {
        return Err(anyhow!("{what} rejected by server"));
    }
    if !as_json {
        println!("{what} ok, credits: {}", credits.unwrap_or(0));
    }
    Ok(())
}
