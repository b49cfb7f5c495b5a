use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use sentiscope::config::{self, Config};
use sentiscope::gateway::{BackendClient, ClassifierClient};
use sentiscope::markdown;
use sentiscope::model::{Mode, Tab, TimeFilter};
use sentiscope::profile::{self, Profile, ProfileStore, SqliteProfileStore};
use sentiscope::report;
use sentiscope::session::{Gateways, SessionController, SessionEvent};

#[derive(Debug, Parser)]
#[command(author, version, about = "Keyword sentiment analysis over Reddit posts")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze one keyword and print the selected tab
    Analyze {
        keyword: String,
        /// all, day, week, month or year
        #[arg(long, default_value = "all")]
        filter: TimeFilter,
        /// Signed-in user id; omit for guest mode
        #[arg(long)]
        user: Option<String>,
        /// sentiment, posts, summary or visualization
        #[arg(long, default_value = "sentiment")]
        tab: Tab,
        #[arg(long, default_value = "1")]
        page: usize,
        /// Seconds to wait for the background summary
        #[arg(long, default_value = "30")]
        wait_summary: u64,
        /// Print the summary as HTML instead of the selected tab
        #[arg(long)]
        html: bool,
    },
    /// Interactive session (type `help` for commands)
    Shell {
        #[arg(long)]
        user: Option<String>,
    },
    /// Show usage statistics for a user
    Usage {
        #[arg(long)]
        user: String,
        /// Number of recent searches to list
        #[arg(long, default_value = "10")]
        show: usize,
    },
    /// Print an example configuration file
    ExampleConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    match args.command {
        Command::Analyze {
            keyword,
            filter,
            user,
            tab,
            page,
            wait_summary,
            html,
        } => {
            let cfg = load_config(&args.config)?;
            let session = build_session(&cfg, mode_for(user)).await?;
            session.submit_analysis(&keyword, filter).await?;
            session.select_tab(tab).await?;
            session.set_page(page).await;
            if html || tab == Tab::Summary || tab == Tab::Visualization {
                if tokio::time::timeout(Duration::from_secs(wait_summary), session.settle())
                    .await
                    .is_err()
                {
                    warn!(wait_summary, "summary still pending");
                }
            }
            if html {
                let summary = session.snapshot().await.summary.unwrap_or_default();
                print!("{}", markdown::to_html(&summary));
            } else {
                print!("{}", render(&session).await);
            }
            session.settle().await;
        }
        Command::Shell { user } => {
            let cfg = load_config(&args.config)?;
            let session = build_session(&cfg, mode_for(user)).await?;
            run_shell(session).await?;
        }
        Command::Usage { user, show } => {
            let cfg = load_config(&args.config)?;
            let store = open_store(&cfg).await?;
            let profile = store
                .load_profile(&user)
                .await?
                .unwrap_or_else(|| Profile::empty(&user));
            print!("{}", report::render_usage(&profile, show));
        }
        Command::ExampleConfig => print!("{}", config::example()),
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<Config> {
    let cfg = config::load(Some(path))
        .with_context(|| format!("failed to load {}", path.display()))?;
    cfg.ensure_dirs()?;
    Ok(cfg)
}

fn mode_for(user: Option<String>) -> Mode {
    match user {
        Some(user_id) => Mode::Authenticated { user_id },
        None => Mode::Guest,
    }
}

async fn open_store(cfg: &Config) -> Result<SqliteProfileStore> {
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/sentiscope.db", cfg.app.data_dir));
    let pool = profile::init_pool(&database_url).await?;
    profile::run_migrations(&pool).await?;
    Ok(SqliteProfileStore::new(pool))
}

async fn build_session(cfg: &Config, mode: Mode) -> Result<SessionController> {
    let user_agent = &cfg.gateways.user_agent;
    let backend = Arc::new(BackendClient::new(cfg.api_base_url()?, user_agent)?);
    let classifier = Arc::new(ClassifierClient::new(cfg.classifier_base_url()?, user_agent)?);

    let profiles: Option<Arc<dyn ProfileStore>> = match mode.user_id() {
        Some(user_id) => {
            let store = open_store(cfg).await?;
            match store
                .record_visit(user_id, chrono::Utc::now(), cfg.visit_window())
                .await
            {
                Ok(counted) => info!(user_id, counted, "visit recorded"),
                Err(err) => warn!(?err, "visit tracking failed"),
            }
            Some(Arc::new(store) as Arc<dyn ProfileStore>)
        }
        None => None,
    };

    let options = cfg.session_options(&mode);
    let gateways = Gateways {
        fetch: backend.clone(),
        classifier,
        summarizer: backend,
        profiles,
    };
    Ok(SessionController::new(gateways, mode, options))
}

async fn render(session: &SessionController) -> String {
    let state = session.snapshot().await;
    let page = session.current_page().await;
    let views = session.derived_views().await;
    report::render(&state, &page, &views)
}

const SHELL_HELP: &str = "\
commands:
  analyze <keyword>   run an analysis with the current filter
  filter <f>          all | day | week | month | year
  tab <t>             sentiment | posts | summary | visualization
  page <n> | next | prev
  show                print the current tab
  quit
";

async fn run_shell(session: SessionController) -> Result<()> {
    let mut events = session.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::SummaryReady { .. } => println!("(summary ready: `tab summary`)"),
                SessionEvent::SummaryFailed { .. } => println!("(summary unavailable)"),
                SessionEvent::RevealResults { .. } => {}
            }
        }
    });

    let mut filter = TimeFilter::All;
    if let Some(left) = session.remaining_searches().await {
        println!("Guest access: {left} searches remaining.");
    }
    print!("{SHELL_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let (cmd, rest) = match line.trim().split_once(' ') {
            Some((c, r)) => (c.to_string(), r.trim().to_string()),
            None => (line.trim().to_string(), String::new()),
        };
        match cmd.as_str() {
            "" => continue,
            "quit" | "exit" => break,
            "help" => print!("{SHELL_HELP}"),
            "filter" => match rest.parse::<TimeFilter>() {
                Ok(f) => {
                    filter = f;
                    println!("filter: {filter}");
                }
                Err(err) => println!("{err}"),
            },
            "analyze" => {
                if let Err(err) = session.submit_analysis(&rest, filter).await {
                    println!("error: {err}");
                    continue;
                }
                print!("{}", render(&session).await);
                if let Some(left) = session.remaining_searches().await {
                    println!("({left} guest searches remaining)");
                }
            }
            "tab" => match rest.parse::<Tab>() {
                Ok(tab) => match session.select_tab(tab).await {
                    Ok(()) => print!("{}", render(&session).await),
                    Err(err) => println!("{err}"),
                },
                Err(err) => println!("{err}"),
            },
            "page" | "next" | "prev" => {
                let current = session.snapshot().await.page;
                let target = match cmd.as_str() {
                    "next" => current + 1,
                    "prev" => current.saturating_sub(1),
                    _ => match rest.parse::<usize>() {
                        Ok(n) => n,
                        Err(_) => {
                            println!("page expects a number");
                            continue;
                        }
                    },
                };
                session.set_page(target).await;
                print!("{}", render(&session).await);
            }
            "show" => print!("{}", render(&session).await),
            other => println!("unknown command '{other}' (try `help`)"),
        }
    }

    session.settle().await;
    Ok(())
}
