use dotenvy::dotenv;
use gatedesk::bot::handlers::{self, get_user_id_safe, Command, SheetsVerifier, StateStorage};
use gatedesk::bot::state::State;
use gatedesk::config::{Settings, RATE_LIMIT_MAX_MESSAGES, RATE_LIMIT_WINDOW_SECS};
use gatedesk::limiter::RateLimiter;
use gatedesk::sheets::SheetsClient;
use gatedesk::verify::Verifier;
use gatedesk::{bot, health};
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{error, info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting sensitive data
struct RedactionPatterns {
    token1: Regex,
    token2: Regex,
    token3: Regex,
    sheets_key: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token1: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token2: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token3: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
            sheets_key: Regex::new(r"key=[A-Za-z0-9_-]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token1
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token2
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token3
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .sheets_key
            .replace_all(&output, "key=[SHEETS_API_KEY]")
            .to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // We return the original buffer length to satisfy the contract,
        // even if the redacted string length differs.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    // Setup logging with redaction
    init_logging(patterns);

    info!("Starting Membership Desk bot...");

    // Load settings; a missing Telegram token is the only fatal condition
    let settings = init_settings();

    // Liveness endpoint runs independently of the bot
    tokio::spawn(health::serve(settings.health_port()));

    // Initialize the verification resolver (degrades when unconfigured)
    let verifier = init_verifier(&settings);

    // Initialize Bot
    let bot = Bot::new(settings.telegram_token.clone());

    // Initialize dialogue storage and the relay rate limiter
    let state_storage: StateStorage = InMemStorage::<State>::new();
    let limiter = Arc::new(RateLimiter::new(
        RATE_LIMIT_MAX_MESSAGES,
        Duration::from_secs(RATE_LIMIT_WINDOW_SECS),
    ));

    // Setup handlers
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![settings, verifier, state_storage, limiter])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            if s.operator_ids().is_empty() {
                warn!("No operator IDs configured; relay and payments are degraded.");
            }
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_verifier(settings: &Settings) -> Arc<SheetsVerifier> {
    let source = match (
        settings.sheets_api_key.clone(),
        settings.spreadsheet_id.clone(),
    ) {
        (Some(api_key), Some(spreadsheet_id)) => {
            info!("Verification store configured (spreadsheet {}).", spreadsheet_id);
            Some(SheetsClient::new(spreadsheet_id, api_key))
        }
        _ => None,
    };

    let verifier = Arc::new(Verifier::new(
        source,
        settings.new_member_ranges(),
        settings.old_member_ranges(),
    ));
    if !verifier.is_configured() {
        warn!("Verification store not configured; KYC checks will report pending.");
    }
    verifier
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback_event))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.text().is_some())
                        .endpoint(handle_text_event),
                ),
        )
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    settings: Arc<Settings>,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => handlers::start(bot, msg).await,
        Command::Help => handlers::help(bot, msg, settings).await,
        Command::Healthcheck => handlers::healthcheck(bot, msg).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_callback_event(
    bot: Bot,
    q: CallbackQuery,
    storage: StateStorage,
    settings: Arc<Settings>,
    verifier: Arc<SheetsVerifier>,
) -> Result<(), teloxide::RequestError> {
    let sender = q.from.id.0.cast_signed();
    if let Err(e) = handlers::handle_callback(bot, q, storage, settings, verifier).await {
        error!("Callback handler error for {}: {}", sender, e);
    }
    respond(())
}

async fn handle_text_event(
    bot: Bot,
    msg: Message,
    storage: StateStorage,
    settings: Arc<Settings>,
    limiter: Arc<RateLimiter>,
) -> Result<(), teloxide::RequestError> {
    let sender = get_user_id_safe(&msg);
    let dialogue = bot::handlers::BotDialogue::new(storage, msg.chat.id);
    if let Err(e) = handlers::handle_text(bot, msg, dialogue, settings, limiter).await {
        error!("Text handler error for {}: {}", sender, e);
    }
    respond(())
}
