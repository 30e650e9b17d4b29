//! Hearthvale - headless simulation runner
//!
//! Builds the village, populates it, runs the scheduler for a number of ticks
//! and prints a JSON report. With `--dialogue`, conversations are voiced through
//! the dialogue service on a tokio runtime; the simulation never waits for it.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use hearthvale::core::config::SimulationConfig;
use hearthvale::core::error::Result;
use hearthvale::core::types::AgentId;
use hearthvale::llm::client::DialogueClient;
use hearthvale::llm::dialogue::{conversation_prompt, DialogueHistory, DialogueRequest};
use hearthvale::simulation::events::SimEvent;
use hearthvale::simulation::probability::seeded;
use hearthvale::simulation::scheduler::{AgentSummary, Scheduler};
use hearthvale::world::village::VillageLayout;

const NAMES: [&str; 12] = [
    "Ada", "Bram", "Cora", "Dell", "Edda", "Finn", "Greta", "Hob", "Ilse", "Jory", "Kit", "Lorn",
];

/// World generation draws from its own stream so the layout does not shift
/// when behavior rolls change
const WORLD_SEED_SALT: u64 = 0x5eed_0f_7e22a1;

/// Hearthvale - autonomous villager simulation
#[derive(Parser, Debug)]
#[command(name = "hearthvale")]
#[command(about = "Run the village simulation headless and print a JSON report")]
struct Args {
    /// Random seed (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Ticks to simulate
    #[arg(long, default_value_t = 3000)]
    ticks: u64,

    /// Number of villagers
    #[arg(long, default_value_t = 6)]
    agents: usize,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pace ticks against the wall clock
    #[arg(long)]
    realtime: bool,

    /// Voice conversations through the dialogue service (needs LLM_API_KEY)
    #[arg(long)]
    dialogue: bool,

    /// Log a progress line every N ticks (0 = never)
    #[arg(long, default_value_t = 0)]
    report_every: u64,
}

#[derive(Serialize)]
struct RunReport {
    seed: u64,
    ticks: u64,
    agents: Vec<AgentSummary>,
    events: BTreeMap<&'static str, usize>,
    dialogue_lines: usize,
}

struct DialogueLine {
    visitor: AgentId,
    target: AgentId,
    reply: String,
}

/// Fire-and-forget dialogue requests; replies come back over a channel
struct DialogueRunner {
    runtime: Runtime,
    client: Arc<DialogueClient>,
    history: DialogueHistory,
    tx: mpsc::UnboundedSender<DialogueLine>,
    rx: mpsc::UnboundedReceiver<DialogueLine>,
    spoken: usize,
}

impl DialogueRunner {
    fn start() -> Option<Self> {
        let client = match DialogueClient::from_env() {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("dialogue disabled: {}", e);
                return None;
            }
        };
        let runtime = match Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!("dialogue disabled, no runtime: {}", e);
                return None;
            }
        };
        let (tx, rx) = mpsc::unbounded_channel();
        Some(Self {
            runtime,
            client: Arc::new(client),
            history: DialogueHistory::new(),
            tx,
            rx,
            spoken: 0,
        })
    }

    fn request(&self, sim: &Scheduler, visitor: AgentId, target: AgentId) {
        let (Ok(visitor_state), Ok(target_state)) = (sim.state(visitor), sim.state(target)) else {
            return;
        };
        let request = DialogueRequest::new(conversation_prompt(visitor_state, target_state))
            .with_history(self.history.transcript(visitor, target));

        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            match client.reply(&request).await {
                Ok(response) => {
                    let _ = tx.send(DialogueLine {
                        visitor,
                        target,
                        reply: response.reply,
                    });
                }
                Err(e) => tracing::warn!(%visitor, %target, "dialogue request failed: {}", e),
            }
        });
    }

    fn collect(&mut self, sim: &Scheduler) {
        while let Ok(line) = self.rx.try_recv() {
            let name = sim
                .state(line.visitor)
                .map(|s| s.name.clone())
                .unwrap_or_else(|_| line.visitor.to_string());
            tracing::info!("{}: \"{}\"", name, line.reply);
            self.history
                .record(line.visitor, line.target, format!("NPC: {}", line.reply));
            self.spoken += 1;
        }
    }

    fn finish(mut self, sim: &Scheduler) -> usize {
        self.collect(sim);
        self.runtime.shutdown_timeout(Duration::from_secs(2));
        self.spoken
    }
}

fn villager_name(index: usize) -> String {
    let base = NAMES[index % NAMES.len()];
    match index / NAMES.len() {
        0 => base.to_string(),
        round => format!("{} {}", base, round + 1),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hearthvale=info")),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let seed = config.seed;
    let tick_ms = config.tick_ms;

    let layout = VillageLayout::from_config(&config);
    let map = layout.build_map(config.pond_tiles, &mut seeded(seed ^ WORLD_SEED_SALT));
    let homes = layout.farm_homes(args.agents)?;

    let mut sim = Scheduler::new(config, map)?;
    for (i, home) in homes.into_iter().enumerate() {
        sim.add_agent(villager_name(i), home);
    }
    tracing::info!(seed, agents = sim.store().len(), "Hearthvale starting");

    let mut dialogue = if args.dialogue {
        DialogueRunner::start()
    } else {
        None
    };

    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for _ in 0..args.ticks {
        sim.run_tick();

        for event in sim.drain_events() {
            *counts.entry(event.kind()).or_default() += 1;
            if let (Some(runner), SimEvent::ConversationStarted { visitor, target }) =
                (&dialogue, &event)
            {
                runner.request(&sim, *visitor, *target);
            }
        }
        if let Some(runner) = dialogue.as_mut() {
            runner.collect(&sim);
        }

        if args.report_every > 0 && sim.tick() % args.report_every == 0 {
            let gold: u32 = sim.store().iter().map(|r| r.state.gold()).sum();
            tracing::info!(
                tick = sim.tick(),
                active_tasks = sim.active_task_count(),
                total_gold = gold,
                "progress"
            );
        }

        if args.realtime {
            std::thread::sleep(Duration::from_millis(tick_ms));
        }
    }

    let dialogue_lines = dialogue.map(|runner| runner.finish(&sim)).unwrap_or(0);

    let report = RunReport {
        seed,
        ticks: sim.tick(),
        agents: sim.summaries(),
        events: counts,
        dialogue_lines,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
