//! tgclient setup wizard.
//!
//! Asks for the bot token and sign-in details on the terminal and writes
//! `config.toml` to the project root (`TGCLIENT_ROOT`, or the current directory).

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

// ── Config formatting ──────────────────────────────────────────────────────────

struct ConfigParams<'a> {
    bot_token: &'a str,
    api_id: &'a str,
    api_hash: &'a str,
    phone_number: &'a str,
    base_url: &'a str,
    poll_timeout: u32,
    max_retries: u32,
}

/// Produces a valid config.toml string. Extracted so it can be unit-tested.
fn format_config(p: &ConfigParams<'_>) -> String {
    let api_id = if p.api_id.trim().is_empty() {
        "0"
    } else {
        p.api_id.trim()
    };

    let phone_line = if p.phone_number.is_empty() {
        "# phone_number = \"+15550100\"".to_owned()
    } else {
        format!("phone_number = \"{}\"", p.phone_number)
    };

    let bot_token = p.bot_token;
    let api_hash = p.api_hash;
    let base_url = p.base_url;
    let poll_timeout = p.poll_timeout;
    let request_timeout = poll_timeout.saturating_add(30);
    let max_retries = p.max_retries;

    format!(
        r#"[telegram]
bot_token = "{bot_token}"
api_id = {api_id}
api_hash = "{api_hash}"
{phone_line}

[api]
base_url = "{base_url}"
timeout_secs = {request_timeout}

[app]
name = "MyTelegramApp"
description = "Description of my Telegram app"
url = "https://example.com"

[polling]
timeout_secs = {poll_timeout}
max_retries = {max_retries}
"#
    )
}

// ── CLI ────────────────────────────────────────────────────────────────────────

fn run_cli(project_root: &Path) -> Result<()> {
    println!("=== tgclient setup ===\n");

    let read_line = |prompt: &str| -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut buf = String::new();
        io::stdin().read_line(&mut buf)?;
        Ok(buf.trim().to_owned())
    };

    let or_default = |s: String, default: &str| {
        if s.is_empty() {
            default.to_owned()
        } else {
            s
        }
    };

    let bot_token = read_line("Telegram bot token: ")?;
    let api_id = read_line("API id (optional): ")?;
    let api_hash = read_line("API hash (optional): ")?;
    let phone_number = read_line("Phone number for sign-in (optional): ")?;
    let base_url = or_default(
        read_line("Bot API URL [https://api.telegram.org]: ")?,
        "https://api.telegram.org",
    );
    let poll_timeout = or_default(read_line("Long-poll timeout in seconds [30]: ")?, "30")
        .parse::<u32>()
        .context("Long-poll timeout must be a whole number")?;
    let max_retries = or_default(read_line("Retries after a network error [0]: ")?, "0")
        .parse::<u32>()
        .context("Retries must be a whole number")?;

    let config = format_config(&ConfigParams {
        bot_token: &bot_token,
        api_id: &api_id,
        api_hash: &api_hash,
        phone_number: &phone_number,
        base_url: &base_url,
        poll_timeout,
        max_retries,
    });

    let config_path = project_root.join("config.toml");
    std::fs::write(&config_path, &config)
        .with_context(|| format!("Could not write {}", config_path.display()))?;

    println!("\n✓  config.toml saved to {}", config_path.display());
    println!("   Run the bot with:  cargo run");
    Ok(())
}

fn main() -> Result<()> {
    let project_root =
        PathBuf::from(std::env::var("TGCLIENT_ROOT").unwrap_or_else(|_| ".".to_string()));
    run_cli(&project_root)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(bot_token: &str, api_id: &str, phone_number: &str) -> String {
        format_config(&ConfigParams {
            bot_token,
            api_id,
            api_hash: "abc123",
            phone_number,
            base_url: "https://api.telegram.org",
            poll_timeout: 30,
            max_retries: 0,
        })
    }

    #[test]
    fn test_telegram_section_present() {
        let out = cfg("mytoken", "123456", "");
        assert!(out.contains("[telegram]"));
        assert!(out.contains(r#"bot_token = "mytoken""#));
        assert!(out.contains("api_id = 123456"));
        assert!(out.contains(r#"api_hash = "abc123""#));
    }

    #[test]
    fn test_empty_api_id_defaults_to_zero() {
        let out = cfg("t", "  ", "");
        assert!(out.contains("api_id = 0"));
    }

    #[test]
    fn test_phone_commented_when_empty() {
        let out = cfg("t", "1", "");
        assert!(out.contains("# phone_number ="));
        assert!(!out.contains("\nphone_number = "));
    }

    #[test]
    fn test_phone_included_when_set() {
        let out = cfg("t", "1", "+15550100");
        assert!(out.contains(r#"phone_number = "+15550100""#));
    }

    #[test]
    fn test_request_timeout_outlasts_long_poll() {
        let out = cfg("t", "1", "");
        assert!(out.contains("[polling]\ntimeout_secs = 30"));
        assert!(out.contains("[api]\nbase_url = \"https://api.telegram.org\"\ntimeout_secs = 60"));
    }

    #[test]
    fn test_huge_poll_timeout_caps_request_timeout() {
        let out = format_config(&ConfigParams {
            bot_token: "t",
            api_id: "1",
            api_hash: "h",
            phone_number: "",
            base_url: "https://api.telegram.org",
            poll_timeout: u32::MAX,
            max_retries: 0,
        });
        let line = format!("timeout_secs = {}", u32::MAX);
        assert_eq!(out.matches(&line).count(), 2);
    }

    #[test]
    fn test_output_loads_as_config() {
        let out = cfg("123:ABC", "42", "+15550100");
        let config = tgclient::Config::parse(&out).unwrap();
        assert_eq!(config.telegram.api_id, 42);
        assert_eq!(config.phone_or_token(), "+15550100");
    }
}
