//! Guard subcommands
//!
//! Each command loads a [`GuardConfig`] (optionally from a JSON file), layers
//! the command-line flags on top, validates it and then talks to the backend.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use safespot_guard::alerting::{tel_uri, whatsapp_uri, whatsapp_web_url, CommandOpener};
use safespot_guard::integration::{FixedLocation, MotionPattern, SimulatedMotionFeed};
use safespot_guard::{
    compose_alert, BackendClient, ClassificationResult, ClassificationService, Collaborators,
    ConsoleChannel, ContactDirectory, EscalationDispatcher, EscalationPolicy, GeoPoint,
    GuardConfig, LocationProvider, MotionSample, SafetyMonitor, SensorReading, TrustedContact,
    UriChannel,
};

/// Backend and identity flags shared by every networked command
#[derive(Args, Debug, Clone)]
pub struct BackendArgs {
    /// JSON configuration file; flags override its values
    #[arg(short, long, env = "SAFESPOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, env = "SAFESPOT_BACKEND_URL")]
    pub base_url: Option<String>,

    /// User whose contacts and history are used
    #[arg(short, long, env = "SAFESPOT_USER_ID")]
    pub user_id: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, env = "SAFESPOT_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,
}

/// Simulated device position
#[derive(Args, Debug, Clone)]
pub struct LocationArgs {
    /// Latitude reported by the simulated location provider
    #[arg(long, default_value = "9.94", allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude reported by the simulated location provider
    #[arg(long, default_value = "78.12", allow_hyphen_values = true)]
    pub lng: f64,

    /// Speed in metres per second
    #[arg(long, default_value = "0")]
    pub speed: f64,
}

impl LocationArgs {
    fn point(&self) -> Result<GeoPoint> {
        let point = GeoPoint::new(self.lat, self.lng);
        if !point.is_valid() {
            anyhow::bail!("invalid coordinates {},{}", self.lat, self.lng);
        }
        Ok(point)
    }
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub backend: BackendArgs,

    #[command(flatten)]
    pub location: LocationArgs,

    /// Simulated motion signal
    #[arg(short, long, value_enum, default_value = "walking")]
    pub pattern: PatternArg,

    /// Treat every sample as abnormal (testing override)
    #[arg(long, env = "SAFESPOT_FORCE_ABNORMAL")]
    pub force_abnormal: bool,

    /// Which abnormal state escalates
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// Tick interval in milliseconds
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Cooldown window in seconds
    #[arg(long)]
    pub cooldown_secs: Option<u64>,

    /// Deliver through device links opened by this program (e.g. xdg-open)
    /// instead of printing to the console
    #[arg(long)]
    pub opener: Option<String>,

    /// Post journey points while monitoring
    #[arg(long)]
    pub journey: bool,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    pub duration_secs: Option<u64>,
}

/// Arguments for the contacts command
#[derive(Args, Debug)]
pub struct ContactsArgs {
    #[command(flatten)]
    pub backend: BackendArgs,

    /// Print JSON instead of a list
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the classify command
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub backend: BackendArgs,

    #[command(flatten)]
    pub location: LocationArgs,

    /// Simulated motion signal
    #[arg(short, long, value_enum, default_value = "still")]
    pub pattern: PatternArg,

    /// Print the request body before sending
    #[arg(short, long)]
    pub verbose: bool,
}

/// Arguments for the alert-preview command
#[derive(Args, Debug)]
pub struct AlertPreviewArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// Classifier intensity label to report
    #[arg(short, long, default_value = "Hard Bump")]
    pub intensity: String,

    /// Preview the manual test trigger message instead
    #[arg(long)]
    pub forced: bool,

    /// Also print device links for this phone number
    #[arg(long)]
    pub phone: Option<String>,
}

/// Motion pattern argument enum for CLI
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum PatternArg {
    Still,
    Walking,
    Shaking,
}

impl From<PatternArg> for MotionPattern {
    fn from(val: PatternArg) -> Self {
        match val {
            PatternArg::Still => MotionPattern::Still,
            PatternArg::Walking => MotionPattern::Walking,
            PatternArg::Shaking => MotionPattern::Shaking,
        }
    }
}

/// Escalation policy argument enum for CLI
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum PolicyArg {
    Confirmed,
    Immediate,
}

impl From<PolicyArg> for EscalationPolicy {
    fn from(val: PolicyArg) -> Self {
        match val {
            PolicyArg::Confirmed => EscalationPolicy::Confirmed,
            PolicyArg::Immediate => EscalationPolicy::Immediate,
        }
    }
}

/// Load the configuration file (or defaults) and apply flag overrides
pub fn load_config(args: &BackendArgs) -> Result<GuardConfig> {
    let mut config = match &args.config {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading configuration file");
            GuardConfig::from_json(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => GuardConfig::default(),
    };

    if let Some(url) = &args.base_url {
        config.backend.base_url = url.clone();
    }
    if let Some(user) = &args.user_id {
        config.backend.user_id = user.clone();
    }
    if let Some(ms) = args.timeout_ms {
        config.backend.request_timeout_ms = ms;
    }
    tracing::debug!(
        base_url = %config.backend.base_url,
        user_id = %config.backend.user_id,
        "Configuration resolved"
    );
    Ok(config)
}

fn backend_client(config: &GuardConfig) -> Result<Arc<BackendClient>> {
    let client = BackendClient::new(&config.backend, config.min_phone_digits)
        .context("Failed to create backend client")?;
    Ok(Arc::new(client))
}

/// Execute the run command
pub async fn run(args: RunArgs) -> Result<()> {
    let mut config = load_config(&args.backend)?;
    config.force_abnormal |= args.force_abnormal;
    if let Some(policy) = args.policy {
        config.escalation_policy = policy.into();
    }
    if let Some(ms) = args.tick_ms {
        config.tick_interval_ms = ms;
    }
    if let Some(secs) = args.cooldown_secs {
        config.cooldown_ms = secs.saturating_mul(1000);
    }
    config.journey.enabled |= args.journey;
    config.validate().context("Invalid configuration")?;

    let point = args.location.point()?;
    let backend = backend_client(&config)?;

    let mut dispatcher = EscalationDispatcher::new(config.dispatch(), backend.clone());
    match &args.opener {
        Some(program) => {
            let opener = CommandOpener::new(program.clone(), &["whatsapp", "https", "tel"]);
            let channel = Arc::new(UriChannel::new(opener));
            dispatcher.add_message_channel(channel.clone());
            dispatcher.add_call_channel(channel);
        }
        None => {
            dispatcher.add_message_channel(Arc::new(ConsoleChannel));
            dispatcher.add_call_channel(Arc::new(ConsoleChannel));
        }
    }

    let mut collaborators = Collaborators::new(
        Arc::new(FixedLocation::new(point).with_speed(args.location.speed)),
        Arc::new(SimulatedMotionFeed::new(args.pattern.into())),
        backend.clone(),
        Arc::new(dispatcher),
    );
    if config.journey.enabled {
        collaborators = collaborators.with_journey(backend);
    }

    println!("{} Starting safety monitor...", "[SAFESPOT]".bright_cyan().bold());
    println!();
    println!("{}", "Configuration:".bold());
    println!("  {} {}", "Backend:".dimmed(), config.backend.base_url);
    println!("  {} {}", "User:".dimmed(), config.backend.user_id);
    println!("  {} {}", "Location:".dimmed(), point);
    println!("  {} {:?}", "Pattern:".dimmed(), args.pattern);
    println!("  {} {}ms", "Tick:".dimmed(), config.tick_interval_ms);
    println!("  {} {:?}", "Policy:".dimmed(), config.escalation_policy);
    println!("  {} {}s", "Cooldown:".dimmed(), config.cooldown().as_secs());
    if config.force_abnormal {
        println!("  {} {}", "Test mode:".dimmed(), "every sample is abnormal".yellow().bold());
    }
    println!();

    let mut monitor = SafetyMonitor::new(config, collaborators);
    monitor.start().await.context("Failed to start monitoring")?;

    match args.duration_secs {
        Some(secs) => {
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    res.context("Failed to listen for Ctrl-C")?;
                    tracing::info!("Interrupted");
                }
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    tracing::info!(duration_secs = secs, "Run duration elapsed");
                }
            }
        }
        None => {
            println!("{}", "Press Ctrl-C to stop".dimmed());
            tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Interrupted");
        }
    }

    monitor.stop().await;

    let stats = monitor.stats();
    println!();
    println!("{}", "Session summary:".bold());
    println!("  {} {}", "Ticks:".dimmed(), stats.ticks);
    println!("  {} {}", "Skipped:".dimmed(), stats.skipped_ticks);
    println!("  {} {}", "Abnormal verdicts:".dimmed(), stats.abnormal_verdicts);
    println!("  {} {}", "Escalations:".dimmed(), stats.escalations.to_string().red().bold());
    println!("  {} {}", "Suppressed:".dimmed(), stats.suppressed_triggers);
    println!("  {} {}", "Journey points:".dimmed(), stats.journey_points);

    Ok(())
}

/// Execute the contacts command
pub async fn contacts(args: ContactsArgs) -> Result<()> {
    let config = load_config(&args.backend)?;
    config.validate().context("Invalid configuration")?;
    let backend = backend_client(&config)?;

    let contacts = backend
        .trusted_contacts()
        .await
        .with_context(|| format!("Failed to fetch contacts for {}", config.backend.user_id))?;
    tracing::debug!(count = contacts.len(), "Trusted contacts fetched");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&contacts)?);
        return Ok(());
    }

    print_contacts(&config.backend.user_id, &contacts);
    Ok(())
}

fn print_contacts(user_id: &str, contacts: &[TrustedContact]) {
    if contacts.is_empty() {
        println!("{} No trusted contacts for {}", "[WARN]".yellow().bold(), user_id);
        return;
    }

    println!("{} {} trusted contact(s) for {}", "[SAFESPOT]".bright_cyan().bold(), contacts.len(), user_id);
    for (i, contact) in contacts.iter().enumerate() {
        let marker = if i == 0 { " (called first)".green().to_string() } else { String::new() };
        println!("  {}. {} {}{}", i + 1, contact.name.bold(), contact.phone.dimmed(), marker);
    }
}

/// Execute the classify command
pub async fn classify(args: ClassifyArgs) -> Result<()> {
    let config = load_config(&args.backend)?;
    config.validate().context("Invalid configuration")?;
    let backend = backend_client(&config)?;

    let location = FixedLocation::new(args.location.point()?).with_speed(args.location.speed);
    let fix = location.current_fix().await?;
    let (acceleration, angular_velocity) = MotionPattern::from(args.pattern).sample(0);
    let sample = MotionSample {
        captured_at: fix.captured_at,
        location: fix,
        acceleration: SensorReading {
            value: acceleration,
            age: Some(Duration::ZERO),
        },
        angular_velocity: SensorReading {
            value: angular_velocity,
            age: Some(Duration::ZERO),
        },
    };

    if args.verbose {
        let payload = sample.to_payload(backend.user_id());
        println!("{}", serde_json::to_string_pretty(&payload)?);
    }

    let verdict = backend
        .classify(&sample)
        .await
        .context("Classification request failed")?;
    tracing::debug!(abnormal = verdict.is_abnormal, intensity = %verdict.intensity, "Sample classified");
    print_verdict(&verdict);
    Ok(())
}

fn print_verdict(verdict: &ClassificationResult) {
    let label = if verdict.is_abnormal {
        "ABNORMAL".red().bold()
    } else {
        "NORMAL".green().bold()
    };
    println!("{} {} ({})", "[VERDICT]".bright_cyan().bold(), label, verdict.intensity);
}

/// Execute the alert-preview command
pub fn alert_preview(args: AlertPreviewArgs) -> Result<()> {
    let point = args.location.point()?;
    let verdict = if args.forced {
        ClassificationResult::forced()
    } else {
        ClassificationResult::new(true, args.intensity)
    };

    let alert = compose_alert(&verdict.escalation_reason(), point);
    println!("{}", alert);

    if let Some(phone) = &args.phone {
        let contact = TrustedContact::new("preview", "preview", phone);
        println!();
        println!("{}", "Device links:".bold());
        println!("  {} {}", "WhatsApp:".dimmed(), whatsapp_uri(&contact.phone, &alert.body));
        println!("  {} {}", "Web:".dimmed(), whatsapp_web_url(&contact.phone, &alert.body));
        println!("  {} {}", "Call:".dimmed(), tel_uri(&contact.phone));
    }

    Ok(())
}
