use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use newsdigest::ai::GeminiClient;
use newsdigest::auth::OAuthFlow;
use newsdigest::config::Config;
use newsdigest::feed::{read_opml, BatchError, FeedFetcher};
use newsdigest::language::{Language, TextDirection};
use newsdigest::news::{
    Article, BoardSource, CacheState, CategorizedArticles, Digest, DigestError, ErrorKind,
    GeopoliticalNews, HeadlinesEngine,
};
use newsdigest::session::Session;
use newsdigest::storage::{Database, DatabaseError};
use newsdigest::util::strip_control_chars;

/// Get the config directory path (~/.config/newsdigest/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("newsdigest"))
}

#[derive(Parser, Debug)]
#[command(name = "newsdigest", version, about = "AI-categorized news digests from RSS, OPML and Inoreader")]
struct Args {
    /// Config file (default: ~/.config/newsdigest/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Local store (default: ~/.config/newsdigest/newsdigest.db)
    #[arg(long, value_name = "FILE", global = true)]
    db: Option<PathBuf>,

    /// Target language for this run only (fa, en, ar, fr, de, es, ru, zh)
    #[arg(long, value_name = "CODE", global = true)]
    language: Option<Language>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch feed URLs and summarize them by category
    Summarize {
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,
    },
    /// Summarize every feed listed in an OPML file
    Opml {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Show the geopolitical headlines board
    Headlines {
        /// Keep running and merge in a fresh board every cache period
        #[arg(long)]
        watch: bool,
    },
    /// Manage Inoreader authorization
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Show or persist the target language
    Language {
        #[arg(value_name = "CODE")]
        code: Option<Language>,
    },
}

#[derive(Subcommand, Debug)]
enum AuthAction {
    /// Print the authorization URL for an Inoreader app
    Begin {
        #[arg(long)]
        client_id: String,
        #[arg(long)]
        client_secret: String,
        /// Open the URL in the default browser
        #[arg(long)]
        open: bool,
    },
    /// Finish authorization with the URL the browser was redirected to
    Complete {
        #[arg(value_name = "REDIRECT_URL")]
        redirect_url: String,
    },
    /// Show whether usable credentials are stored
    Status,
    /// Delete stored credentials
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(hint) = e.downcast_ref::<DigestError>().and_then(hint_for) {
                eprintln!("{hint}");
            }
            ExitCode::FAILURE
        }
    }
}

fn hint_for(err: &DigestError) -> Option<&'static str> {
    match err.kind() {
        ErrorKind::Auth => {
            Some("Check GEMINI_API_KEY, or re-authorize Inoreader with `newsdigest auth begin`.")
        }
        ErrorKind::Network => Some("Check your connection and try again."),
        ErrorKind::Format | ErrorKind::Upstream => None,
    }
}

fn ensure_config_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).context("Failed to create config directory")?;
    }

    // SEC-007: Directory holds credentials; keep it user-only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700)) {
            tracing::warn!(path = %dir.display(), error = %e, "Failed to set config directory permissions to 0700");
        }
    }
    Ok(())
}

async fn open_database(path: &Path) -> Result<Database> {
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    match Database::open(path_str).await {
        Ok(db) => Ok(db),
        Err(e @ DatabaseError::InstanceLocked) => Err(e.into()),
        Err(e) => Err(anyhow::anyhow!("Failed to open database: {}", e)),
    }
}

async fn run(args: Args) -> Result<()> {
    let config_dir = get_config_dir()?;
    let config_path = args.config.clone().unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)?;

    let db_path = match &args.db {
        Some(path) => path.clone(),
        None => {
            ensure_config_dir(&config_dir)?;
            config_dir.join("newsdigest.db")
        }
    };
    let db = open_database(&db_path).await?;

    let mut session = Session::restore(db.clone(), config.language).await?;
    if let Some(language) = args.language {
        session.override_language(language);
    }

    let client = newsdigest::http::build_client(config.request_timeout() * 2)
        .context("Failed to build HTTP client")?;

    match args.command {
        Command::Summarize { urls } => {
            let digest = build_digest(&client, &config)?;
            let articles = digest.summarize_urls(&mut session, &urls).await?;
            print_digest(&articles, session.language().direction(), args.json)?;
        }
        Command::Opml { file } => {
            let opml = read_opml(&file).await.map_err(DigestError::from)?;
            let digest = build_digest(&client, &config)?;
            let articles = digest.summarize_opml(&mut session, &opml).await?;
            print_digest(&articles, session.language().direction(), args.json)?;
        }
        Command::Headlines { watch } => {
            let engine = HeadlinesEngine::new(
                db,
                build_fetcher(&client, &config)?,
                Arc::new(build_ai(&client, &config)?),
                config.headlines_config(),
            );
            show_headlines(&engine, session.language(), watch, args.json).await?;
        }
        Command::Auth { action } => run_auth(action, &client, &config, &mut session).await?,
        Command::Language { code: Some(language) } => {
            session.set_language(language).await?;
            println!("Language set to {} ({})", language, language.english_name());
        }
        Command::Language { code: None } => {
            let language = session.language();
            println!("{} ({})", language, language.english_name());
        }
    }

    Ok(())
}

fn build_ai(client: &reqwest::Client, config: &Config) -> Result<GeminiClient, DigestError> {
    Ok(GeminiClient::new(client.clone(), config.gemini_config())?)
}

fn build_fetcher(client: &reqwest::Client, config: &Config) -> Result<FeedFetcher, DigestError> {
    FeedFetcher::new(client.clone(), config.fetcher_config())
        .map_err(|e| DigestError::Batch(BatchError::Feed(e)))
}

fn build_digest(client: &reqwest::Client, config: &Config) -> Result<Digest, DigestError> {
    Ok(Digest::new(
        build_fetcher(client, config)?,
        Arc::new(build_ai(client, config)?),
    ))
}

async fn show_headlines(
    engine: &HeadlinesEngine,
    language: Language,
    watch: bool,
    json: bool,
) -> Result<()> {
    let state = engine.cache_state(language).await?;
    let mounted = engine.mount(language).await?;

    match (mounted.source, state) {
        (BoardSource::Cache, CacheState::Warm { remaining }) => {
            eprintln!("(cached, refreshes in {}s)", remaining.as_secs());
        }
        _ => eprintln!("(fresh)"),
    }
    let direction = language.direction();
    print_board(&mounted.news, direction, json)?;

    if !watch {
        return Ok(());
    }

    let handle = engine.spawn_refresh(language, mounted.news);
    let mut board = handle.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = board.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = board.borrow_and_update().clone();
                eprintln!("({} new)", current.new_count());
                print_board(&current, direction, json)?;
            }
        }
    }

    handle.stop().await.context("Refresh task panicked")?;
    Ok(())
}

async fn run_auth(
    action: AuthAction,
    client: &reqwest::Client,
    config: &Config,
    session: &mut Session,
) -> Result<()> {
    match action {
        AuthAction::Begin {
            client_id,
            client_secret,
            open,
        } => {
            let flow = OAuthFlow::new(client.clone(), session.db().clone(), config.oauth_config())?;
            let url = flow.begin_auth(&client_id, &client_secret).await?;
            println!("{url}");
            if open {
                if let Err(e) = open::that(&url) {
                    tracing::warn!(error = %e, "Failed to open browser");
                }
            }
            eprintln!("After approving, run: newsdigest auth complete '<redirected URL>'");
        }
        AuthAction::Complete { redirect_url } => {
            let flow = OAuthFlow::new(client.clone(), session.db().clone(), config.oauth_config())?;
            let credentials = flow.complete_auth(&redirect_url).await?;
            session.set_credentials(credentials).await?;
            println!("Inoreader authorized.");
        }
        AuthAction::Status => match session.credentials() {
            Some(c) if c.is_complete() => println!("Authorized (client id {})", c.client_id()),
            Some(c) => println!("Client {} registered, authorization pending", c.client_id()),
            None => println!("Not authorized"),
        },
        AuthAction::Clear => {
            session.clear_credentials().await?;
            println!("Credentials cleared.");
        }
    }
    Ok(())
}

fn print_article(article: &Article, direction: TextDirection) {
    let mark = direction.line_mark();
    let new = if article.is_new { "[new] " } else { "" };
    println!("  - {mark}{new}{}", strip_control_chars(&article.title));
    println!("    {mark}{}", strip_control_chars(&article.summary));
    println!("    {}", strip_control_chars(&article.url));
}

fn print_digest(articles: &CategorizedArticles, direction: TextDirection, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(articles)?);
        return Ok(());
    }
    if articles.is_empty() {
        println!("No articles.");
    }
    for group in articles.groups() {
        println!(
            "\n{}{} ({})",
            direction.line_mark(),
            strip_control_chars(&group.category),
            group.articles.len()
        );
        group.articles.iter().for_each(|a| print_article(a, direction));
    }
    Ok(())
}

fn print_board(news: &GeopoliticalNews, direction: TextDirection, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(news)?);
        return Ok(());
    }

    println!("\nSupporters ({})", news.supporters.len());
    news.supporters.iter().for_each(|a| print_article(a, direction));
    println!("\nOpponents ({})", news.opponents.len());
    news.opponents.iter().for_each(|a| print_article(a, direction));
    for country in &news.countries {
        println!(
            "\n{}{} ({})",
            direction.line_mark(),
            strip_control_chars(&country.country_name),
            country.articles.len()
        );
        country.articles.iter().for_each(|a| print_article(a, direction));
    }
    Ok(())
}
