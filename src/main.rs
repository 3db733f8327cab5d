// src/main.rs
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::time::Instant;

use dispatch_lib::{
    assignment::PgAssignmentStore,
    db,
    directory::PgResponderDirectory,
    AssignmentSnapshot, AssignmentStore, AssignmentSubmitter, DispatchConfig, DistanceAnnotatedResponder,
    ResponderKind, Target, TargetId, TargetKind,
};

#[derive(Parser, Debug)]
#[command(name = "dispatch", version, about = "Nearest-responder assignment for disasters and reports")]
struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List ranked candidates around a target
    Candidates(TargetArgs),
    /// Assign the single nearest responder
    AutoAssign(TargetArgs),
    /// Toggle responders into the current assignment and submit it
    Assign {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(long = "responder", required = true, help = "Responder id to toggle (repeatable)")]
        responders: Vec<String>,
    },
    /// Print the stored assignment
    Show(TargetArgs),
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// disaster or report
    target_kind: TargetKind,
    target_id: String,
    /// firefighter or ngo
    responder_kind: ResponderKind,
}

impl TargetArgs {
    fn target(&self) -> Target {
        Target {
            kind: self.target_kind,
            id: TargetId(self.target_id.clone()),
        }
    }
}

type PgSubmitter = AssignmentSubmitter<PgResponderDirectory, PgAssignmentStore>;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();

    // Env files are applied while the process is still single-threaded
    if db::load_first_env_file(&[".env", ".env.local", "../.env"]).is_none() {
        info!("No .env file found, using environment variables from system");
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let start_time = Instant::now();

    let pool = db::connect(&db::DbSettings::from_env())
        .await
        .context("Failed to connect to database")?;
    info!("Successfully connected to the database");

    let config = DispatchConfig::from_env();
    info!(
        "Dispatch config: limit={}, radius={}m, broaden below {}",
        config.candidate_limit, config.max_distance_meters, config.min_candidates
    );
    let submitter = AssignmentSubmitter::new(
        PgResponderDirectory::new(pool.clone()),
        PgAssignmentStore::new(pool),
        config,
    );

    match &cli.command {
        Commands::Candidates(args) => {
            let ranked = submitter
                .candidates_for(&args.target(), args.responder_kind)
                .await
                .context("Failed to fetch candidates")?;
            print_candidates(&ranked, cli.json)?;
        }
        Commands::AutoAssign(args) => {
            let snapshot = submitter
                .auto_assign(&args.target(), args.responder_kind)
                .await
                .context("Auto-assignment failed")?;
            print_snapshot(&snapshot, cli.json)?;
        }
        Commands::Assign { target, responders } => {
            let snapshot = assign_manually(&submitter, target, responders).await?;
            print_snapshot(&snapshot, cli.json)?;
        }
        Commands::Show(args) => {
            let stored = submitter
                .store()
                .load_snapshot(&args.target(), args.responder_kind)
                .await
                .context("Failed to load assignment")?;
            match stored {
                Some(snapshot) => print_snapshot(&snapshot, cli.json)?,
                None if cli.json => println!("null"),
                None => println!("No {} assignment for {}", args.responder_kind, args.target()),
            }
        }
    }

    info!("Done in {:.2?}", start_time.elapsed());
    Ok(())
}

async fn assign_manually(
    submitter: &PgSubmitter,
    args: &TargetArgs,
    responder_ids: &[String],
) -> Result<AssignmentSnapshot> {
    let target = args.target();
    let ranked = submitter
        .candidates_for(&target, args.responder_kind)
        .await
        .context("Failed to fetch candidates")?;
    let mut selection = submitter
        .open_selection(&target, args.responder_kind)
        .await
        .context("Failed to load current assignment")?;

    for id in responder_ids {
        let Some(candidate) = ranked
            .iter()
            .find(|c| c.responder.id.as_ref().map(|r| r.0.as_str()) == Some(id.as_str()))
        else {
            bail!(
                "Responder {} is not among the {} ranked candidates for {}",
                id,
                ranked.len(),
                target
            );
        };
        selection.toggle(candidate);
    }

    submitter
        .submit(&target, args.responder_kind, &selection)
        .await
        .context("Assignment failed")
}

fn print_candidates(ranked: &[DistanceAnnotatedResponder], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(ranked)?);
        return Ok(());
    }
    if ranked.is_empty() {
        println!("No candidates found");
    }
    for (i, c) in ranked.iter().enumerate() {
        println!(
            "{:>2}. {:<24} {:<28} {:>9.0}m  {}{}",
            i + 1,
            c.responder.name,
            c.responder.affiliation,
            c.distance_meters,
            c.responder.id.as_ref().map(|id| id.0.as_str()).unwrap_or("-"),
            c.rank.map(|r| format!("  ({})", r.as_str())).unwrap_or_default()
        );
    }
    Ok(())
}

fn print_snapshot(snapshot: &AssignmentSnapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(());
    }
    println!(
        "Assignment {} ({}, {} responder(s), at {})",
        snapshot.assignment_id,
        snapshot.responder_kind,
        snapshot.entries.len(),
        snapshot.assigned_at.to_rfc3339()
    );
    for entry in &snapshot.entries {
        println!(
            "  - {} / {}  phone: {}  distance: {}",
            entry.name,
            entry.affiliation,
            entry.phone_number.as_deref().unwrap_or("-"),
            entry
                .distance_meters
                .map(|d| format!("{:.0}m", d))
                .unwrap_or_else(|| "-".to_string())
        );
    }
    Ok(())
}
