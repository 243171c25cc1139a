use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use crate::auth::Token;
use crate::config::Config;
use crate::feed::{CcTrayClient, FeedSource};
use crate::monitor::BuildMonitor;
use crate::notifier::{LogNotifier, MessageFormat, Notifier, SlackClient, SlackNotifier};
use crate::output::{self, FetchProgress};

#[derive(Parser)]
#[command(name = "buildwatch")]
#[command(author, version, about = "CI build notifications for chat", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./buildwatch.toml or the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// CI server base URL
    #[arg(short, long, global = true)]
    url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the build feed and post transitions to chat
    Watch(WatchArgs),
    /// Fetch the build feed once and print it
    Status {
        /// Print the snapshot as JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List chat channels visible to the token
    Channels {
        #[arg(short, long, env = "SLACK_TOKEN")]
        token: Option<String>,
    },
}

#[derive(Args, Default)]
struct WatchArgs {
    #[arg(short, long, env = "SLACK_TOKEN")]
    token: Option<String>,

    /// Channel display name to post into
    #[arg(long)]
    channel: Option<String>,

    /// Seconds between polls
    #[arg(short, long)]
    interval: Option<u64>,

    /// Project to ignore (repeatable)
    #[arg(short, long)]
    exclude: Vec<String>,

    /// Log notifications instead of posting them
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Stop after this many polls
    #[arg(long)]
    cycles: Option<usize>,

    /// Poll once and exit (same as --cycles 1)
    #[arg(long, default_value_t = false, conflicts_with = "cycles")]
    once: bool,
}

impl WatchArgs {
    fn max_cycles(&self) -> Option<usize> {
        if self.once {
            Some(1)
        } else {
            self.cycles
        }
    }
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(url) = &self.url {
            config.server.base_url = Some(url.clone());
        }
        Ok(config)
    }

    async fn execute_watch(&self, mut config: Config, args: &WatchArgs) -> Result<()> {
        if let Some(interval) = args.interval {
            config.server.interval_secs = interval;
        }
        config.server.exclude.extend(args.exclude.iter().cloned());
        if let Some(token) = &args.token {
            config.chat.token = Some(token.clone());
        }
        if let Some(channel) = &args.channel {
            config.chat.channel = Some(channel.clone());
        }
        let cycles = args.max_cycles();

        let base_url = config.base_url()?;
        let interval = config.interval()?;
        let source = CcTrayClient::new(base_url)?;
        let format = MessageFormat::new(base_url, config.chat.message_prefix.as_deref());

        if args.dry_run {
            info!("Dry run: notifications will only be logged");
            return Self::watch(source, LogNotifier::new(format), &config, interval, cycles).await;
        }

        let token = config
            .chat
            .token
            .as_deref()
            .context("No chat token configured (use --token, SLACK_TOKEN or chat.token)")?;
        let channel = config
            .chat
            .channel
            .as_deref()
            .context("No chat channel configured (use --channel or chat.channel)")?;

        let client = SlackClient::new(&config.chat.api_url, Token::from(token))?;
        let notifier = SlackNotifier::connect(client, channel, format).await?;
        info!(
            "Posting notifications to #{} ({})",
            notifier.channel().name,
            notifier.channel().id
        );

        Self::watch(source, notifier, &config, interval, cycles).await
    }

    async fn watch<S: FeedSource, N: Notifier>(
        source: S,
        notifier: N,
        config: &Config,
        interval: std::time::Duration,
        cycles: Option<usize>,
    ) -> Result<()> {
        info!(
            "Watching {} every {}s",
            config.server.base_url.as_deref().unwrap_or_default(),
            interval.as_secs()
        );
        if !config.server.exclude.is_empty() {
            info!("Excluding: {}", config.server.exclude.join(", "));
        }

        let mut monitor = BuildMonitor::new(source, notifier, config.server.exclude.clone());
        monitor.run(interval, cycles).await?;

        Ok(())
    }

    async fn execute_status(&self, config: Config, json: bool) -> Result<()> {
        let source = CcTrayClient::new(config.base_url()?)?;

        let progress = FetchProgress::start("build feed");
        let snapshot = match source.fetch().await {
            Ok(snapshot) => {
                progress.finish("build feed");
                snapshot
            }
            Err(e) => {
                progress.abandon();
                return Err(e.into());
            }
        };

        if json {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        } else {
            output::print_snapshot(&snapshot, source.feed_url().as_str(), chrono::Local::now());
        }
        Ok(())
    }

    async fn execute_channels(&self, config: Config, token: Option<&str>) -> Result<()> {
        let token = token
            .or(config.chat.token.as_deref())
            .context("No chat token configured (use --token, SLACK_TOKEN or chat.token)")?;

        let client = SlackClient::new(&config.chat.api_url, Token::from(token))?;
        let channels = client.list_channels().await?;

        output::print_channels(&channels);
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        let config = self.load_config()?;

        match &self.command {
            Commands::Watch(args) => self.execute_watch(config, args).await,
            Commands::Status { json } => self.execute_status(config, *json).await,
            Commands::Channels { token } => self.execute_channels(config, token.as_deref()).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_watch_arguments() {
        let cli = Cli::try_parse_from([
            "buildwatch",
            "--url",
            "https://ci.example.com",
            "watch",
            "--dry-run",
            "--exclude",
            "docs",
            "--exclude",
            "nightly",
            "--interval",
            "5",
        ])
        .unwrap();

        assert_eq!(cli.url.as_deref(), Some("https://ci.example.com"));
        match cli.command {
            Commands::Watch(args) => {
                assert_eq!(args.exclude, vec!["docs", "nightly"]);
                assert!(args.dry_run);
                assert_eq!(args.interval, Some(5));
                assert_eq!(args.max_cycles(), None);
            }
            _ => panic!("expected watch command"),
        }
    }

    #[test]
    fn test_once_means_a_single_cycle() {
        let cli = Cli::try_parse_from(["buildwatch", "watch", "--once"]).unwrap();
        match cli.command {
            Commands::Watch(args) => assert_eq!(args.max_cycles(), Some(1)),
            _ => panic!("expected watch command"),
        }

        let cli = Cli::try_parse_from(["buildwatch", "watch", "--cycles", "3"]).unwrap();
        match cli.command {
            Commands::Watch(args) => assert_eq!(args.max_cycles(), Some(3)),
            _ => panic!("expected watch command"),
        }

        let result = Cli::try_parse_from(["buildwatch", "watch", "--once", "--cycles", "3"]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_dry_run_watch_single_cycle() {
        let mut server = mockito::Server::new_async().await;
        let feed = server
            .mock("GET", "/cc.xml")
            .with_body(r#"<Projects><Project name="api" lastBuildLabel="1" lastBuildStatus="Success" activity="Sleeping"/></Projects>"#)
            .create_async()
            .await;

        let cli = Cli::try_parse_from(["buildwatch", "watch", "--dry-run", "--once"]).unwrap();
        let Commands::Watch(args) = &cli.command else {
            panic!("expected watch command");
        };

        let mut config = Config::default();
        config.server.base_url = Some(server.url());

        cli.execute_watch(config, args).await.unwrap();

        feed.assert_async().await;
    }

    #[tokio::test]
    async fn test_watch_without_channel_fails_before_polling() {
        let mut config = Config::default();
        config.server.base_url = Some("https://ci.example.com".to_string());

        let cli = Cli::try_parse_from(["buildwatch", "watch"]).unwrap();
        let args = WatchArgs {
            token: Some("xoxb-test".to_string()),
            once: true,
            ..WatchArgs::default()
        };
        let result = cli.execute_watch(config, &args).await;

        assert!(result.unwrap_err().to_string().contains("channel"));
    }

    #[tokio::test]
    async fn test_status_reports_unreachable_feed() {
        let mut config = Config::default();
        config.server.base_url = Some("http://127.0.0.1:9".to_string());

        let cli = Cli::try_parse_from(["buildwatch", "status", "--json"]).unwrap();
        let err = cli.execute_status(config, true).await.unwrap_err();

        assert!(err.to_string().contains("Failed to fetch build feed"));
    }
}
