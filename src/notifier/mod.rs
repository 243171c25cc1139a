mod console;
mod slack;

use async_trait::async_trait;

use crate::builds::BuildRecord;
use crate::error::Result;
use crate::monitor::BuildEvent;

pub use console::LogNotifier;
pub use slack::{SlackChannel, SlackClient, SlackNotifier};

/// Destination for build notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, build: &BuildRecord, event: BuildEvent) -> Result<()>;
}

/// Renders notification lines such as
/// `Failed: api - https://ci.example.com/job/api/42/`.
#[derive(Debug, Clone)]
pub struct MessageFormat {
    base_url: String,
    prefix: String,
}

impl MessageFormat {
    pub fn new(base_url: &str, prefix: Option<&str>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            prefix: prefix.unwrap_or_default().to_string(),
        }
    }

    /// The message without the channel prefix.
    pub fn line(&self, build: &BuildRecord, event: BuildEvent) -> String {
        format!(
            "{}: {} - {}/job/{}/{}/",
            event.label(),
            build.name,
            self.base_url,
            build.name,
            build.number
        )
    }

    pub fn render(&self, build: &BuildRecord, event: BuildEvent) -> String {
        format!("{}{}", self.prefix, self.line(build, event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builds::record;

    #[test]
    fn test_render_message() {
        let format = MessageFormat::new("https://ci.example.com/", None);
        let build = record("api", 42, "Failure", "Sleeping");

        assert_eq!(
            format.render(&build, BuildEvent::Failed),
            "Failed: api - https://ci.example.com/job/api/42/"
        );
    }

    #[test]
    fn test_render_message_with_prefix() {
        let format = MessageFormat::new("https://ci.example.com", Some("[ci] "));
        let build = record("web", 8, "Failure", "Sleeping");

        assert_eq!(
            format.render(&build, BuildEvent::StillFailing),
            "[ci] Still failing: web - https://ci.example.com/job/web/8/"
        );
        assert_eq!(
            format.line(&build, BuildEvent::StillFailing),
            "Still failing: web - https://ci.example.com/job/web/8/"
        );
    }
}
