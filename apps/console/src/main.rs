use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use data_facade::{resources::DEFAULT_SERVICE, DataFacade};
use search_client::load_settings;
use sequencer::{
    format_clock, format_revenue,
    story::{self, StoryBeat},
    CascadeDriver, CascadeEvent, ChatDriver, ChatEvent, PlaybackDriver, RevenueTicker,
    TickerDriver, Timeline, TimelineConfig, TimelineEvent,
};
use serde::Serialize;
use shared::{
    domain::{ChatMessage, ChatRole, RunbookCategory},
    fixtures,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "opsboard", about = "Headless host for the incident-response demo")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play the scripted incident narrative.
    Demo {
        /// Milliseconds per timeline second.
        #[arg(long, default_value_t = 1000)]
        tick_ms: u64,
    },
    /// Animate the blast-radius failure cascade.
    Cascade,
    /// Ask the simulated agents something.
    Chat { text: String },
    /// Fetch one dashboard resource, live or from fixtures.
    Fetch {
        resource: ResourceKind,
        #[arg(long, default_value = DEFAULT_SERVICE)]
        service: String,
        #[arg(long, value_parser = parse_category)]
        category: Option<RunbookCategory>,
        /// Also print this host's CPU/memory timeline (infra-hosts only).
        #[arg(long)]
        host: Option<String>,
    },
    /// Show whether resources come from the backend or fixtures.
    Status,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ResourceKind {
    Services,
    AlertRules,
    ErrorTrends,
    SignificantTerms,
    InfraHosts,
    BlastRadius,
    Runbooks,
}

fn parse_category(raw: &str) -> Result<RunbookCategory, String> {
    RunbookCategory::parse(raw).ok_or_else(|| format!("unknown runbook category '{raw}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Command::Demo { tick_ms } => run_demo(tick_ms).await?,
        Command::Cascade => run_cascade().await?,
        Command::Chat { text } => run_chat(&text).await,
        Command::Fetch {
            resource,
            service,
            category,
            host,
        } => fetch(resource, service, category, host).await?,
        Command::Status => status(),
    }

    Ok(())
}

fn print_beat(timeline: &Timeline<StoryBeat>, revenue: u64) {
    let beat = timeline.current_beat();
    let state = timeline.state();
    let feature = beat
        .payload
        .feature
        .map(|f| format!(" [{f}]"))
        .unwrap_or_default();
    println!(
        "[{} / {}] step {}/{}  {}  {}{}  -> {}  (revenue lost {})",
        format_clock(state.elapsed_seconds),
        format_clock(timeline.config().max_duration),
        beat.index + 1,
        timeline.beat_count(),
        beat.payload.clock,
        beat.title,
        feature,
        beat.payload.route,
        format_revenue(revenue),
    );
    println!("    {}", beat.payload.narrator);
}

async fn run_demo(tick_ms: u64) -> Result<()> {
    let config = TimelineConfig {
        tick_interval: Duration::from_millis(tick_ms.max(1)),
        ..TimelineConfig::default()
    };
    let driver = PlaybackDriver::new(story::demo_timeline_with(config)?);
    let revenue = TickerDriver::start(RevenueTicker::default());
    let mut events = driver.subscribe();

    driver.inspect(|timeline| print_beat(timeline, revenue.amount()));
    driver.start();

    loop {
        match events.recv().await {
            Ok(TimelineEvent::BeatChanged { .. }) => {
                driver.inspect(|timeline| print_beat(timeline, revenue.amount()));
            }
            Ok(TimelineEvent::Finished { elapsed_seconds }) => {
                println!("finished at {}", format_clock(elapsed_seconds));
                break;
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "demo output fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
    revenue.stop();
    Ok(())
}

async fn run_cascade() -> Result<()> {
    let driver = CascadeDriver::new(story::demo_cascade()?);
    let mut events = driver.subscribe();
    driver.run_cascade();

    loop {
        match events.recv().await {
            Ok(CascadeEvent::Restarted) => println!("cascade started"),
            Ok(CascadeEvent::WaveRevealed {
                wave,
                nodes,
                target,
            }) => {
                let names: Vec<&str> = nodes.iter().map(|n| n.as_str()).collect();
                println!("wave {wave}: {} -> {}", names.join(", "), target.label());
            }
            Ok(CascadeEvent::Settled) => break,
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "cascade output fell behind"),
            Err(RecvError::Closed) => break,
        }
    }

    println!("settled:");
    for node in fixtures::blast_radius().nodes {
        println!("  {:<10} {}", node.id.as_str(), driver.status_of(&node.id).label());
    }
    Ok(())
}

fn print_message(message: &ChatMessage) {
    let who = match (message.role, message.agent) {
        (ChatRole::User, _) => "you".to_string(),
        (ChatRole::Tool, Some(agent)) => format!("{} (tool)", agent.label()),
        (_, Some(agent)) => agent.label().to_string(),
        (_, None) => "assistant".to_string(),
    };
    println!("--- {who}");
    if let Some(tool) = &message.tool_name {
        println!("[{tool}]");
    }
    println!("{}", message.content);
    if let Some(query) = &message.tool_query {
        println!("{query}");
    }
}

async fn run_chat(text: &str) {
    let driver = ChatDriver::default();
    let mut events = driver.subscribe();
    if !driver.send(text) {
        println!("nothing to send");
        return;
    }

    loop {
        match events.recv().await {
            Ok(ChatEvent::Message { message }) => print_message(&message),
            Ok(ChatEvent::StatusChanged { status }) => println!("*** incident status: {status:?}"),
            Ok(ChatEvent::AgentActive { .. }) => {}
            Ok(ChatEvent::Idle) | Err(RecvError::Closed) => break,
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "chat output fell behind"),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to render output")?
    );
    Ok(())
}

async fn fetch(
    resource: ResourceKind,
    service: String,
    category: Option<RunbookCategory>,
    host: Option<String>,
) -> Result<()> {
    let settings = load_settings();
    let facade = DataFacade::from_settings(&settings);

    match resource {
        ResourceKind::Services => print_json(&facade.services().fetch().await),
        ResourceKind::AlertRules => print_json(&facade.alert_rules().fetch().await),
        ResourceKind::ErrorTrends => print_json(&facade.error_trends(service).fetch().await),
        ResourceKind::SignificantTerms => {
            print_json(&facade.significant_terms(service).fetch().await)
        }
        ResourceKind::InfraHosts => {
            let feed = facade.infra_hosts();
            print_json(&feed.fetch().await)?;
            match host {
                Some(host) => print_json(&feed.resource().host_timeline(&host)),
                None => Ok(()),
            }
        }
        ResourceKind::BlastRadius => print_json(&facade.blast_radius().fetch().await),
        ResourceKind::Runbooks => print_json(&facade.runbooks(category).fetch().await),
    }
}

fn status() {
    let settings = load_settings();
    match settings.backend_url() {
        Ok(Some(url)) => {
            println!("mode: live");
            println!("backend: {url}");
            println!(
                "api key: {}",
                if settings.es_api_key.is_some() { "set" } else { "not set" }
            );
            println!("timeout: {}s", settings.request_timeout_seconds);
        }
        Ok(None) if settings.force_mock => println!("mode: mock (forced)"),
        Ok(None) => println!("mode: mock (no backend url)"),
        Err(err) => println!("mode: mock ({err:#})"),
    }
}
