use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use gacha_backend::{Backend, BackendConfig};
use gacha_types::{NewGameSettings, PlayerId, Rarity, RarityWeights, SettingsId};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const TOKEN_ENV: &str = "GACHA_TOKEN";

fn init_tracing() -> Result<()> {
    let endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .ok()
        .and_then(|value| {
            let trimmed = value.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        });

    if let Some(endpoint) = endpoint {
        let service_name =
            env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "gacha-backend".to_string());
        let rate = env::var("OTEL_SAMPLING_RATE")
            .ok()
            .and_then(|value| value.parse::<f64>().ok())
            .map(|value| value.clamp(0.0, 1.0))
            .unwrap_or(1.0);
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .build()
            .context("failed to build OTLP exporter")?;
        let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
            .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(rate))
            .with_resource(
                opentelemetry_sdk::Resource::builder_empty()
                    .with_attributes([opentelemetry::KeyValue::new("service.name", service_name)])
                    .build(),
            )
            .with_batch_exporter(exporter)
            .build();
        let tracer = tracer_provider.tracer("gacha-backend");
        opentelemetry::global::set_tracer_provider(tracer_provider);

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(LevelFilter::INFO),
            )
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .init();
    } else {
        // stdout carries command output
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    Ok(())
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Gacha draw and economy backend", long_about = None)]
struct Args {
    /// Path to the SQLite database (in-memory when omitted).
    #[arg(long)]
    database_path: Option<PathBuf>,

    /// Redis URL for the master data cache (in-process cache when omitted).
    #[arg(long)]
    cache_redis_url: Option<String>,

    /// Key prefix for the Redis master data cache.
    #[arg(long)]
    cache_redis_prefix: Option<String>,

    /// Timeout for each Redis cache operation in milliseconds (must be > 0 when set).
    #[arg(long)]
    cache_timeout_ms: Option<u64>,

    /// How long a store call waits on a locked database in milliseconds (must be > 0 when set).
    #[arg(long)]
    store_busy_timeout_ms: Option<u64>,

    /// Seed for reproducible lottery draws (optional).
    #[arg(long)]
    deterministic_seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the catalog and active settings into the cache.
    Warm,
    /// Register a player and print its token.
    Register { name: String },
    /// Credit coins to a player.
    Grant {
        #[arg(long)]
        token: Option<String>,
        amount: u64,
    },
    /// Show a player's balance and high score.
    Player {
        #[arg(long)]
        token: Option<String>,
    },
    /// Spend coins on draws.
    Draw {
        #[arg(long)]
        token: Option<String>,
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        count: i64,
    },
    /// Submit a finished game's score.
    Finish {
        #[arg(long)]
        token: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        score: i64,
    },
    /// Show a leaderboard page.
    Rankings {
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        start_rank: i64,
        /// Defaults to the active settings' page size.
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Show the catalog with the player's owned items marked.
    Collection {
        #[arg(long)]
        token: Option<String>,
    },
    /// Catalog administration.
    Item {
        #[command(subcommand)]
        command: ItemCommand,
    },
    /// Game settings administration.
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ItemCommand {
    Add {
        name: String,
        /// N, R or SR.
        #[arg(long)]
        rarity: Rarity,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Show the active settings.
    Show,
    List,
    Get { id: SettingsId },
    Add {
        #[arg(long)]
        draw_cost: u64,
        #[arg(long)]
        ranking_page_size: u32,
        #[arg(long)]
        weight_n: u32,
        #[arg(long)]
        weight_r: u32,
        #[arg(long)]
        weight_sr: u32,
        #[arg(long)]
        max_draw_count: u32,
        /// Activate the new settings immediately.
        #[arg(long, default_value_t = false)]
        activate: bool,
    },
    Activate { id: SettingsId },
}

impl Command {
    /// Gameplay commands refuse to run on a cold cache.
    fn requires_warm_cache(&self) -> bool {
        matches!(
            self,
            Self::Draw { .. } | Self::Finish { .. } | Self::Rankings { .. } | Self::Collection { .. }
        )
    }
}

fn build_config(args: &Args) -> Result<BackendConfig> {
    let defaults = BackendConfig::default();
    if let Some(0) = args.cache_timeout_ms {
        anyhow::bail!("cache_timeout_ms must be > 0 when set");
    }
    if let Some(0) = args.store_busy_timeout_ms {
        anyhow::bail!("store_busy_timeout_ms must be > 0 when set");
    }

    Ok(BackendConfig {
        database_path: args.database_path.clone(),
        cache_redis_url: args.cache_redis_url.clone(),
        cache_redis_prefix: args
            .cache_redis_prefix
            .clone()
            .or(defaults.cache_redis_prefix),
        cache_timeout_ms: args.cache_timeout_ms.or(defaults.cache_timeout_ms),
        store_busy_timeout_ms: args.store_busy_timeout_ms.or(defaults.store_busy_timeout_ms),
        deterministic_seed: args.deterministic_seed.or(defaults.deterministic_seed),
    })
}

fn require_arg_or_env(value: Option<String>, env_key: &str) -> Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }
    env::var(env_key).map_err(|_| anyhow!("Missing {env_key} (flag or env var)"))
}

async fn resolve_player(backend: &Backend, token: Option<String>) -> Result<PlayerId> {
    let token = require_arg_or_env(token, TOKEN_ENV)?;
    backend
        .authenticate(&token)
        .await
        .context("failed to authenticate player")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(backend: &Backend, command: Command) -> Result<()> {
    match command {
        Command::Warm => {
            backend.warm().await.context("failed to warm cache")?;
            print_json(backend.active_settings().await?.as_ref())
        }
        Command::Register { name } => print_json(&backend.register(&name).await?),
        Command::Grant { token, amount } => {
            let player = resolve_player(backend, token).await?;
            print_json(&backend.grant_coins(player, amount).await?)
        }
        Command::Player { token } => {
            let player = resolve_player(backend, token).await?;
            print_json(&backend.player(player).await?)
        }
        Command::Draw { token, count } => {
            let player = resolve_player(backend, token).await?;
            print_json(&backend.draw(player, count).await?)
        }
        Command::Finish { token, score } => {
            let player = resolve_player(backend, token).await?;
            print_json(&backend.finish(player, score).await?)
        }
        Command::Rankings {
            start_rank,
            page_size,
        } => {
            let page = match page_size {
                Some(page_size) => backend.rankings(start_rank, page_size).await?,
                None => backend.ranking_page(start_rank).await?,
            };
            print_json(&page)
        }
        Command::Collection { token } => {
            let player = resolve_player(backend, token).await?;
            print_json(&backend.collection(player).await?)
        }
        Command::Item {
            command: ItemCommand::Add { name, rarity },
        } => print_json(&backend.master().add_item(&name, rarity).await?),
        Command::Settings { command } => match command {
            SettingsCommand::Show => print_json(backend.active_settings().await?.as_ref()),
            SettingsCommand::List => print_json(&backend.settings_list().await?),
            SettingsCommand::Get { id } => print_json(&backend.settings(id).await?),
            SettingsCommand::Add {
                draw_cost,
                ranking_page_size,
                weight_n,
                weight_r,
                weight_sr,
                max_draw_count,
                activate,
            } => {
                let settings = backend
                    .add_settings(NewGameSettings {
                        draw_cost,
                        ranking_page_size,
                        per_tier_weights: RarityWeights::new(weight_n, weight_r, weight_sr),
                        max_draw_count,
                    })
                    .await?;
                if activate {
                    print_json(&backend.activate_settings(settings.id).await?)
                } else {
                    print_json(&settings)
                }
            }
            SettingsCommand::Activate { id } => {
                print_json(&backend.activate_settings(id).await?)
            }
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse args
    let args = Args::parse();

    // Create logger
    init_tracing()?;

    let config = build_config(&args)?;
    if config.database_path.is_none() {
        tracing::warn!("no database path set; using an in-memory store");
    }
    let backend = Backend::open(config).context("failed to open backend")?;

    if args.command.requires_warm_cache() {
        backend
            .warm()
            .await
            .context("failed to load master data into the cache")?;
    }

    run(&backend, args.command).await?;
    info!(metrics = ?backend.metrics().snapshot(), "command complete");
    Ok(())
}
