use async_trait::async_trait;
use log::info;

use crate::builds::BuildRecord;
use crate::error::Result;
use crate::monitor::BuildEvent;

use super::{MessageFormat, Notifier};

/// Dry-run notifier: logs each message instead of delivering it.
pub struct LogNotifier {
    format: MessageFormat,
}

impl LogNotifier {
    pub fn new(format: MessageFormat) -> Self {
        Self { format }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, build: &BuildRecord, event: BuildEvent) -> Result<()> {
        info!("{}", self.format.render(build, event));
        Ok(())
    }
}
