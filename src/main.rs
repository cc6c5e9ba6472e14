use ads_bot::config::Settings;
use ads_bot::runner::run_bot;
use dotenvy::dotenv;
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting sensitive data
struct RedactionPatterns {
    api_url: Regex,
    bare_token: Regex,
    bot_prefixed: Regex,
    env_assignment: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            api_url: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            bare_token: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            bot_prefixed: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
            env_assignment: Regex::new(r"((?:TELEGRAM|BOT)_TOKEN=)[^\s&]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = self
            .api_url
            .replace_all(input, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .bare_token
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .bot_prefixed
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .env_assignment
            .replace_all(&output, "$1[MASKED]")
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
        // Report the original length; the redacted text may be shorter or longer
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

    // Compile redaction patterns before anything is logged
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    init_logging(patterns);

    info!("Starting Ads Bot...");

    let settings = init_settings();

    run_bot(settings).await;

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);

    let debug_mode = std::env::var("DEBUG_MODE")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let filter = if debug_mode {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("ads_bot=info,teloxide=warn,hyper=warn,reqwest=warn")
        })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(settings) => {
            info!(
                "Configuration loaded successfully (ads file: {}, {} ads per page).",
                settings.ads_file.display(),
                settings.ads_per_page
            );
            Arc::new(settings)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw1";

    #[test]
    fn test_env_assignments_are_masked() -> Result<(), regex::Error> {
        let p = RedactionPatterns::new()?;
        assert_eq!(p.redact("TELEGRAM_TOKEN=abc"), "TELEGRAM_TOKEN=[MASKED]");
        assert_eq!(
            p.redact("loaded APP__TELEGRAM_TOKEN=short-secret from env"),
            "loaded APP__TELEGRAM_TOKEN=[MASKED] from env"
        );
        assert_eq!(
            p.redact("BOT_TOKEN=abc&ads_file=ads.json"),
            "BOT_TOKEN=[MASKED]&ads_file=ads.json"
        );
        assert_eq!(
            p.redact(&format!("BOT_TOKEN={TOKEN}")),
            "BOT_TOKEN=[MASKED]"
        );
        assert_eq!(p.redact("ADS_FILE=ads.json"), "ADS_FILE=ads.json");
        Ok(())
    }

    #[test]
    fn test_api_url_and_bare_tokens_are_redacted() -> Result<(), regex::Error> {
        let p = RedactionPatterns::new()?;
        assert_eq!(
            p.redact(&format!("GET https://api.telegram.org/bot{TOKEN}/getMe failed")),
            "GET https://api.telegram.org/bot[TELEGRAM_TOKEN]/getMe failed"
        );
        assert_eq!(p.redact(&format!("token {TOKEN}")), "token [TELEGRAM_TOKEN]");
        Ok(())
    }

    #[test]
    fn test_writer_redacts_and_reports_original_length() -> Result<(), Box<dyn std::error::Error>> {
        let line = "TELEGRAM_TOKEN=abc\n";
        let mut writer = RedactingWriter::new(Vec::new(), Arc::new(RedactionPatterns::new()?));

        let written = writer.write(line.as_bytes())?;

        assert_eq!(written, line.len());
        assert_eq!(
            String::from_utf8_lossy(&writer.inner),
            "TELEGRAM_TOKEN=[MASKED]\n"
        );
        Ok(())
    }
}
