use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::builds::{Activity, BuildNumber, BuildRecord, BuildStatus, Snapshot};
use crate::error::{MonitorError, Result};

const FEED_PATH: &str = "cc.xml";
const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Source of build snapshots.
///
/// Implementations must report any transport or parse failure as a single
/// [`MonitorError::Fetch`] and never return a partial snapshot.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Snapshot>;
}

/// Reads the CCTray XML feed (`cc.xml`) that Jenkins and most CI servers expose.
pub struct CcTrayClient {
    client: Client,
    feed_url: Url,
}

impl CcTrayClient {
    /// Creates a client for the feed under `base_url` (e.g. `https://ci.example.com/jenkins`).
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("buildwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| MonitorError::Config(format!("Failed to create HTTP client: {e}")))?;

        let feed_url = Url::parse(&format!("{}/{FEED_PATH}", base_url.trim_end_matches('/')))
            .map_err(|e| MonitorError::Config(format!("Invalid feed URL: {e}")))?;

        Ok(Self { client, feed_url })
    }

    pub fn feed_url(&self) -> &Url {
        &self.feed_url
    }

    async fn fetch_body(&self) -> std::result::Result<String, reqwest::Error> {
        self.client
            .get(self.feed_url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl FeedSource for CcTrayClient {
    async fn fetch(&self) -> Result<Snapshot> {
        debug!("Fetching build feed from {}", self.feed_url);

        let body = self
            .fetch_body()
            .await
            .map_err(|e| MonitorError::Fetch(format!("{}: {e}", self.feed_url)))?;

        let snapshot = parse_feed(&body)?;
        debug!("Feed reported {} projects", snapshot.len());

        Ok(snapshot)
    }
}

#[derive(Debug, Deserialize)]
struct CcProjects {
    #[serde(rename = "Project", default)]
    projects: Vec<CcProject>,
}

#[derive(Debug, Deserialize)]
struct CcProject {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@lastBuildLabel", default)]
    last_build_label: String,
    #[serde(rename = "@lastBuildStatus", default)]
    last_build_status: String,
    #[serde(rename = "@activity", default)]
    activity: String,
}

impl From<CcProject> for BuildRecord {
    fn from(project: CcProject) -> Self {
        Self {
            number: BuildNumber::new(project.last_build_label),
            status: BuildStatus::from(project.last_build_status.as_str()),
            activity: Activity::from(project.activity.as_str()),
            name: project.name,
        }
    }
}

/// Parses a CCTray document into a snapshot.
pub fn parse_feed(xml: &str) -> Result<Snapshot> {
    let document: CcProjects = quick_xml::de::from_str(xml)
        .map_err(|e| MonitorError::Fetch(format!("Malformed CCTray feed: {e}")))?;

    Ok(document
        .projects
        .into_iter()
        .filter(|project| {
            let named = !project.name.trim().is_empty();
            if !named {
                warn!("Skipping feed entry without a project name");
            }
            named
        })
        .map(BuildRecord::from)
        .collect())
}
