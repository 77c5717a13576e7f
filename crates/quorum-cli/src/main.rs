//! quorum: run a volunteer simulation against an in-memory scheduler.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use quorum_core::app::{App, AppBuilder, NextTaskRequest, SchedulerConfig};
use quorum_core::domain::{Assignment, Identity, Progress, Project, ProjectId, QuorumError, UserId};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tokio::time::{Duration, sleep};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const PROJECT: ProjectId = ProjectId::new(1);
const ANSWERS: [&str; 3] = ["yes", "no", "unsure"];
const MAX_VOLUNTEERS: i64 = 0x00FF_FFFF;

/// Simulates volunteers pulling and answering tasks of one project.
#[derive(Parser, Debug)]
#[command(name = "quorum", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tasks to import.
    #[arg(long, default_value_t = 20)]
    tasks: usize,

    /// Concurrent volunteers. Anonymous volunteers get addresses in 10.0.0.0/8,
    /// which caps the count.
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..=MAX_VOLUNTEERS))]
    volunteers: u32,

    /// Answers each task needs; defaults to `default_n_answers` from config.
    #[arg(long)]
    n_answers: Option<u32>,

    /// Scheduling policy (default, priority, random, locked).
    #[arg(long)]
    policy: Option<String>,

    /// Volunteers contribute anonymously by address instead of as users.
    #[arg(long)]
    anonymous: bool,

    /// The project refuses anonymous contributions.
    #[arg(long)]
    closed: bool,

    /// Seed for the random policy.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct VolunteerReport {
    identity: Identity,
    answered: u64,
    progress: Progress,
}

#[derive(Debug, Serialize)]
struct Summary {
    policy: Option<String>,
    tasks: usize,
    completed: usize,
    volunteers: Vec<VolunteerReport>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quorum=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SchedulerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SchedulerConfig::default(),
    };
    if let Some(n) = cli.n_answers {
        config.default_n_answers = n;
    }

    let (builder, projects) = AppBuilder::in_memory();
    let app = Arc::new(builder.config(config).build()?);

    let mut project = Project::new(PROJECT).with_anonymous_contributors(!cli.closed);
    if let Some(policy) = &cli.policy {
        project = project.with_sched(policy.clone());
    }
    projects.upsert(project).await;

    let infos = (0..cli.tasks).map(|i| serde_json::json!({ "question": format!("item {i}") }));
    let tasks = app.import_tasks(PROJECT, infos).await?;
    info!(tasks = tasks.len(), volunteers = cli.volunteers, "simulation starting");

    let mut handles = Vec::new();
    for v in 1..=cli.volunteers {
        let identity = volunteer_identity(v, cli.anonymous);
        let mut request = NextTaskRequest::new(PROJECT, identity);
        if let Some(seed) = cli.seed {
            request = request.with_seed(seed.wrapping_add(u64::from(v)));
        }
        handles.push(tokio::spawn(volunteer(app.clone(), request)));
    }

    let mut reports = Vec::new();
    for handle in handles {
        let (identity, answered) = handle.await??;
        let progress = app.user_progress(PROJECT, &identity).await?;
        reports.push(VolunteerReport {
            identity,
            answered,
            progress,
        });
    }

    let mut completed = 0;
    for task in &tasks {
        if !app.task(task.id).await?.state.is_open() {
            completed += 1;
        }
    }

    let summary = Summary {
        policy: cli.policy,
        tasks: tasks.len(),
        completed,
        volunteers: reports,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Identity of volunteer `v`. Anonymous volunteers map onto 10.0.0.0/8 using
/// all 24 host bits, so distinct volunteers never share an address.
fn volunteer_identity(v: u32, anonymous: bool) -> Identity {
    if anonymous {
        Identity::Anonymous(IpAddr::V4(Ipv4Addr::from(0x0A00_0000 | (v & 0x00FF_FFFF))))
    } else {
        Identity::User(UserId::new(u64::from(v)))
    }
}

/// Pull and answer tasks until none are left. Returns how many answers were
/// accepted.
async fn volunteer(app: Arc<App>, request: NextTaskRequest) -> anyhow::Result<(Identity, u64)> {
    let identity = request.identity;
    let mut answered = 0;
    loop {
        let task = match app.new_task(&request).await? {
            Assignment::Task(task) => task,
            Assignment::Empty => break,
            Assignment::Forbidden => {
                warn!(%identity, "not allowed to contribute");
                break;
            }
        };

        let (think_ms, answer) = {
            let mut rng = rand::thread_rng();
            let answer = ANSWERS.choose(&mut rng).copied().unwrap_or("unsure");
            (rng.gen_range(1..20u64), answer)
        };
        sleep(Duration::from_millis(think_ms)).await;

        match app
            .submit_answer(task.id, identity, serde_json::json!({ "answer": answer }))
            .await
        {
            Ok(_) => answered += 1,
            Err(QuorumError::TaskClosed(id)) => info!(%identity, task = %id, "task closed before answer"),
            Err(err @ QuorumError::Conflict { .. }) => warn!(%identity, error = %err, "answer rejected"),
            Err(err) => return Err(err.into()),
        }
    }
    Ok((identity, answered))
}
