use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memescout::cache::{CacheSweeper, MemoryBackend, ResultCache, SystemClock, TtlPolicy};
use memescout::client::{DexScreenerClient, GrokClient, TwitterClient};
use memescout::config::Config;
use memescout::filter::{AgeWindow, FilterRequest, SavedFilterStore, PRESETS};
use memescout::scout::{ListingOutcome, ScoutService};
use memescout::sentiment::{SentimentCollaborators, SentimentOrchestrator};

const DEFAULT_CONFIG_PATH: &str = "config/memescout.toml";
/// Saved filters are keyed by user; the CLI has exactly one
const LOCAL_USER: &str = "local";

const USAGE: &str = "usage: memescout <command> [--page N]

commands:
  presets               list filter presets
  filter <text>         search listings with free-text filters, e.g. \"100k mc, 10k vol\"
  preset <key>          search listings with a preset
  save <name> <text>    save free-text filters under a name
  saved                 list saved filters
  run <name>            search listings with a saved filter
  token <address>       market data for one contract address
  sentiment <address>   sentiment read for one contract address";

#[derive(Debug, PartialEq)]
enum Command {
    Presets,
    Search { request: FilterRequest, page: usize },
    Save { name: String, text: String },
    Saved,
    Run { name: String, page: usize },
    Token(String),
    Sentiment(String),
}

impl Command {
    fn from_args(args: &[String]) -> Result<Self> {
        let (args, page) = take_page(args)?;
        let (name, words) = match args.split_first() {
            Some((name, words)) => (name.as_str(), words),
            None => bail!("missing command"),
        };
        let rest = words.join(" ").trim().to_string();

        match (name, rest.is_empty()) {
            ("presets", _) => Ok(Command::Presets),
            ("saved", _) => Ok(Command::Saved),
            ("filter", false) => Ok(Command::Search {
                request: FilterRequest::Text(rest),
                page,
            }),
            ("preset", false) => Ok(Command::Search {
                request: FilterRequest::Preset(rest),
                page,
            }),
            ("run", false) => Ok(Command::Run { name: rest, page }),
            ("save", false) if words.len() > 1 => Ok(Command::Save {
                name: words[0].clone(),
                text: words[1..].join(" "),
            }),
            ("token", false) => Ok(Command::Token(rest)),
            ("sentiment", false) => Ok(Command::Sentiment(rest)),
            _ => bail!("unrecognized command: {}", args.join(" ")),
        }
    }
}

/// Pull `--page N` out of the arguments; pages are numbered from 1
fn take_page(args: &[String]) -> Result<(Vec<String>, usize)> {
    let mut rest = Vec::with_capacity(args.len());
    let mut page = 1;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--page" {
            let value = iter.next().context("--page needs a number")?;
            page = value
                .parse::<usize>()
                .ok()
                .filter(|p| *p > 0)
                .with_context(|| format!("invalid page number: {}", value))?;
        } else {
            rest.push(arg.clone());
        }
    }
    Ok((rest, page))
}

fn preset_lines() -> Vec<String> {
    PRESETS
        .iter()
        .map(|preset| format!("{:<16} {:<28} {}", preset.key, preset.name, preset.filters()))
        .collect()
}

/// Wired services plus the background sweeper
struct App {
    scout: ScoutService,
    sentiment: SentimentOrchestrator,
    saved: SavedFilterStore,
    saved_path: String,
    page_size: usize,
    shutdown_tx: broadcast::Sender<()>,
    sweeper: JoinHandle<()>,
}

impl App {
    fn new(config: &Config) -> Result<Self> {
        let cache = Arc::new(ResultCache::with_parts(
            Arc::new(MemoryBackend::new()),
            TtlPolicy::from_settings(&config.cache),
            config.cache.retention(),
            Arc::new(SystemClock),
        ));

        let listings = Arc::new(DexScreenerClient::new(config.listings.clone())?);
        let grok = Arc::new(GrokClient::new(&config.api, &config.sentiment)?);
        let twitter = Arc::new(TwitterClient::new(&config.api, config.sentiment.legacy_timeout())?);

        if config.api.xai_api_key.is_none() {
            warn!("⚠️ XAI_API_KEY not set, web search sentiment is unavailable");
        }
        if config.api.twitter_bearer_token.is_none() {
            warn!("⚠️ TWITTER_BEARER_TOKEN not set, legacy sentiment is unavailable");
        }

        let scout = ScoutService::new(cache.clone(), listings, config.sentiment.address_length)
            .with_age_window(AgeWindow::from_settings(&config.listings));
        let saved = SavedFilterStore::load(&config.listings.saved_filters_path)?;
        let sentiment = SentimentOrchestrator::new(
            cache.clone(),
            SentimentCollaborators {
                search: grok.clone(),
                mentions: twitter,
                classifier: grok,
            },
            &config.sentiment,
        );

        let (shutdown_tx, _) = broadcast::channel(1);
        let sweeper = CacheSweeper::new(cache, config.cache.sweep_interval());
        let sweeper = tokio::spawn(sweeper.run(shutdown_tx.subscribe()));

        Ok(Self {
            scout,
            sentiment,
            saved,
            saved_path: config.listings.saved_filters_path.clone(),
            page_size: config.listings.page_size,
            shutdown_tx,
            sweeper,
        })
    }

    #[instrument(skip_all)]
    async fn execute(&self, command: Command) -> Result<()> {
        match command {
            Command::Presets => {
                for line in preset_lines() {
                    println!("{}", line);
                }
            }
            Command::Search { request, page } => self.search(&request, page).await,
            Command::Save { name, text } => match self.saved.save(LOCAL_USER, &name, &text) {
                Ok(replaced) => {
                    self.saved.persist(&self.saved_path)?;
                    match replaced {
                        Some(old) => println!("💾 Replaced {:?} (was: {})", name, old),
                        None => println!("💾 Saved {:?}", name),
                    }
                }
                Err(e) => println!("❌ {}", e),
            },
            Command::Saved => {
                let filters = self.saved.list(LOCAL_USER);
                if filters.is_empty() {
                    println!("No saved filters yet. Use: memescout save <name> <text>");
                }
                for filter in filters {
                    println!("{:<16} {}", filter.name, filter.text);
                }
            }
            Command::Run { name, page } => match self.saved.get(LOCAL_USER, &name) {
                Some(request) => self.search(&request, page).await,
                None => println!("🤷 No saved filter named {:?}", name),
            },
            Command::Token(address) => match self.scout.token_details(&address).await {
                Ok(Some(record)) => println!("{}", serde_json::to_string_pretty(&record)?),
                Ok(None) => println!("🤷 No market data found for {}", address.trim()),
                Err(e) => println!("{}", e.user_message()),
            },
            Command::Sentiment(address) => match self.sentiment.analyze(&address).await {
                Ok(verdict) => println!("{}", verdict),
                Err(e) => {
                    error!("Sentiment analysis failed: {}", e);
                    println!("{}", e.user_message());
                }
            },
        }
        Ok(())
    }

    async fn search(&self, request: &FilterRequest, page: usize) {
        let outcome = match self.scout.search(request).await {
            Ok(ListingOutcome::NoMatches) => {
                println!("🤷 No tokens match these filters right now.");
                return;
            }
            Ok(outcome) => outcome,
            Err(e) => {
                println!("{}", e.user_message());
                return;
            }
        };

        let pages = outcome.page_count(self.page_size);
        let Some(records) = outcome.page(page, self.page_size) else {
            println!("Page {} is past the end, there are {} pages", page, pages);
            return;
        };

        println!("🎯 Found {} matching tokens (page {}/{})", outcome.len(), page, pages);
        for record in records {
            println!(
                "• {} ({}) MC ${:.0} | Vol ${:.0} | Liq ${:.0} | ~{} holders\n  {}",
                record.name,
                record.symbol,
                record.market_cap,
                record.volume_24h,
                record.liquidity,
                record.holder_count,
                record.token_address
            );
        }
        if page < pages {
            println!("More with --page {}", page + 1);
        }
    }

    async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.sweeper.await {
            error!("❌ Cache sweeper task failed: {}", e);
        }
    }
}

fn init_tracing() -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::daily("logs", "memescout.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .compact();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .json()
        .with_current_span(false)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // keep the file writer alive for the whole process
    std::mem::forget(guard);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::from_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    let config_path =
        std::env::var("MEMESCOUT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;
    info!("🐸 Memescout starting (config: {})", config_path);

    let app = App::new(&config)?;
    let result = app.execute(command).await;
    app.shutdown().await;

    info!("👋 Memescout done");
    result
}
