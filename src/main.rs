mod cli;
mod ui;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::Level;

use cli::{Cli, Command, JobCommand, OfferCommand};
use surveyor_dispatch::{DispatchConfig, Dispatcher, race_offer};
use ui::{Printer, RaceProgress};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = DispatchConfig::load().context("loading dispatch.toml")?;
    if let Some(db) = cli.db.clone() {
        config.database_path = db;
    }
    let dispatcher = Dispatcher::from_config(&config)
        .with_context(|| format!("opening {}", config.database_path.display()))?;
    let printer = Printer::new(cli.json);

    match cli.command {
        Command::Offer(OfferCommand::Create {
            fnol_id,
            candidates,
            ttl,
        }) => {
            let ttl = ttl.unwrap_or(config.default_ttl_secs);
            let batch = dispatcher.create_offers(&fnol_id, &candidates, ttl)?;
            printer.batch(&batch, candidates.len());
        }
        Command::Offer(OfferCommand::Accept {
            offer_group,
            surveyor_id,
        }) => {
            let outcome = dispatcher.accept_offer(&offer_group, surveyor_id)?;
            printer.accept(&outcome);
        }
        Command::Offer(OfferCommand::List { offer_group }) => {
            printer.offers(&dispatcher.offers_in_group(&offer_group)?);
        }
        Command::Offer(OfferCommand::Active { surveyor_id }) => {
            let offers = dispatcher.active_offers_for_surveyor(surveyor_id, chrono::Utc::now())?;
            printer.offers(&offers);
        }
        Command::Job(JobCommand::Complete { job_id }) => {
            let ok = dispatcher.complete_job(job_id)?;
            if !ok {
                if let Some(reason) = dispatcher.completion_refusal(job_id)? {
                    tracing::debug!(job_id, %reason, "completion refused");
                }
            }
            printer.complete(job_id, ok);
        }
        Command::Job(JobCommand::List {
            surveyor_id,
            active,
        }) => {
            printer.assignments(&dispatcher.assignments_for_surveyor(surveyor_id, active)?);
        }
        Command::Demo { candidates, ttl } => {
            if candidates < 1 {
                bail!("demo needs at least one candidate, got {candidates}");
            }
            let ids: Vec<i64> = (1..=candidates).collect();
            let ttl = ttl.unwrap_or(config.default_ttl_secs);
            let progress = if cli.json {
                RaceProgress::default()
            } else {
                RaceProgress::start(ids.len() as u64)
            };
            let report = race_offer(Arc::new(dispatcher), "FNOL-DEMO", &ids, ttl, |id, outcome| {
                progress.settled(id, outcome)
            })
            .await?;
            progress.finish();
            printer.race(&report);
        }
    }

    Ok(())
}
