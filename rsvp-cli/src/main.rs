use std::{num::NonZeroU64, path::PathBuf, rc::Rc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rsvp::{
    Aggregator, CountRefresher, HttpAggregator, RecordStore, RsvpController, RsvpForm, Surface,
    ViewUpdate,
};

mod config;
use config::Config;

#[derive(Parser, Debug)]
#[command(version, about = "Collect RSVPs locally and forward them to the host", long_about = None)]
struct Cli {
    /// Aggregator endpoint (overrides RSVP_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Directory holding the local RSVP snapshot (overrides RSVP_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer the invitation
    Submit(SubmitArgs),
    /// Show every RSVP saved on this device
    List,
    /// Show the local and remote RSVP totals
    Count,
    /// Keep polling the remote total until interrupted
    Watch {
        /// Seconds between polls (overrides RSVP_POLL_SECS)
        #[arg(long)]
        interval: Option<NonZeroU64>,
    },
}

#[derive(clap::Args, Debug)]
struct SubmitArgs {
    #[arg(long, default_value = "")]
    name: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    email: String,
    /// Number of guests in the party
    #[arg(long, default_value = "")]
    count: String,
    /// yes, no or maybe
    #[arg(long, default_value = "")]
    attend: String,
}

impl From<SubmitArgs> for RsvpForm {
    fn from(args: SubmitArgs) -> Self {
        RsvpForm {
            name: args.name,
            phone: args.phone,
            email: args.email,
            count: args.count,
            attend: args.attend,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::load(cli.endpoint, cli.data_dir)?;

    tokio::task::LocalSet::new()
        .run_until(run(cli.command, config))
        .await
}

async fn run(command: Command, config: Config) -> Result<()> {
    let store = RecordStore::open(config.storage()).with_context(|| {
        format!(
            "Failed to open local RSVP store at {}",
            config.storage().path().display()
        )
    })?;

    match command {
        Command::Submit(args) => {
            // the answer is kept locally even when there is nowhere to send it
            let controller = RsvpController::new(store, optional_aggregator(&config))
                .with_contact(config.contact.clone());
            controller.surface().register_listener(print_update);

            let publishing = controller.submit(args.into())?;
            // wait for the send so the process doesn't exit with it in flight
            publishing.await.context("Publish task failed")?;
        }
        Command::List => {
            println!("{} RSVP(s) on this device", store.count());
            for record in store.all() {
                println!(
                    "  {:<24} {:<8} name={} party={}",
                    record.key,
                    record.attendance.to_string(),
                    record.name,
                    record.party_size.as_deref().unwrap_or("-"),
                );
            }
        }
        Command::Count => {
            println!("On this device: {}", store.count());
            match optional_aggregator(&config).fetch_count().await {
                Ok(total) => println!("Total RSVPs: {total}"),
                Err(e) => {
                    log::warn!("Error fetching RSVP count: {e}");
                    println!("Total RSVPs: unavailable");
                }
            }
        }
        Command::Watch { interval } => {
            let period = interval
                .map(config::poll_interval)
                .unwrap_or(config.poll_interval);
            let surface = Surface::new(store.count() as u64);
            surface.register_listener(print_update);

            let aggregator = Rc::new(http_aggregator(&config)?);
            let refresher = CountRefresher::new(aggregator, surface).start(period);
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            refresher.shutdown().await;
        }
    }

    Ok(())
}

fn http_aggregator(config: &Config) -> Result<HttpAggregator> {
    Ok(HttpAggregator::new(config.endpoint()?, config.http_timeout)?)
}

fn optional_aggregator(config: &Config) -> Rc<Option<HttpAggregator>> {
    match http_aggregator(config) {
        Ok(aggregator) => Rc::new(Some(aggregator)),
        Err(e) => {
            log::warn!("RSVPs will only be saved on this device: {e:#}");
            Rc::new(None)
        }
    }
}

fn print_update(update: &ViewUpdate) {
    match update {
        ViewUpdate::Count(count) => println!("RSVPs so far: {count}"),
        ViewUpdate::Outcome(outcome) => println!("{}", outcome.headline()),
        // rejections come back as the error from `submit`
        ViewUpdate::Rejected(_) | ViewUpdate::FormReset => {}
    }
}
