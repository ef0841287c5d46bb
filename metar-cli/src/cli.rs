use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use metar_core::{
    Config, MetarService, Notifier, ProviderId, StdoutNotifier, TwilioNotifier, provider, reply,
};
use tracing::info;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "metar", version, about = "Latest METAR for a fixed airport")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the CheckWX API key used by the primary source.
    Configure,

    /// Print the latest report.
    Report,

    /// Answer a chat message the way the WhatsApp webhook would.
    Reply {
        /// Incoming message text.
        message: String,

        /// WhatsApp number to send the reply to; prints it when absent.
        #[arg(long)]
        to: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Report => {
                let config = load_config()?;
                let service = MetarService::from_config(&config)?;
                match service.fetch_and_format_report().await {
                    Ok(report) => println!("{report}"),
                    Err(err) => println!("{err}"),
                }
                Ok(())
            }
            Command::Reply { message, to } => {
                let config = load_config()?;
                let service = MetarService::from_config(&config)?;

                let notifier: Box<dyn Notifier> = match to.as_deref() {
                    Some(_) => {
                        let http = provider::http_client(config.timeout())?;
                        let twilio = TwilioNotifier::new(http, config.twilio.clone());
                        if !twilio.is_configured() {
                            anyhow::bail!(
                                "Twilio credentials are not configured.\n\
                                 Hint: set TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN and TWILIO_WHATSAPP_NUMBER."
                            );
                        }
                        Box::new(twilio)
                    }
                    None => Box::new(StdoutNotifier),
                };

                let to = to.unwrap_or_default();
                if !reply::handle_message(&service, notifier.as_ref(), &to, &message).await {
                    anyhow::bail!("Failed to deliver reply to '{to}'");
                }
                Ok(())
            }
        }
    }
}

fn load_config() -> anyhow::Result<Config> {
    let config = Config::load()?.with_env_overrides();
    if !config.is_provider_configured(ProviderId::CheckWx) {
        info!("no CheckWX API key configured; aviationweather.gov will be used");
    }
    Ok(config)
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("CheckWX API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    config.upsert_provider_api_key(ProviderId::CheckWx, api_key.trim().to_string());
    config.save()?;

    println!(
        "Saved CheckWX API key to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}
