//! Fleet construction and polling helpers

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use shared::{ChannelId, ChannelStatus};
use supervisor::{Fleet, JsonConfigStore};

use super::fixtures::TestFixtures;

pub struct TestHelpers;

impl TestHelpers {
    pub fn id(n: u32) -> ChannelId {
        ChannelId::new(n).unwrap()
    }

    /// Write the document and load a fleet from it through the JSON store
    pub async fn fleet_from(dir: &TempDir, command_template: Value, channels: Value) -> Arc<Fleet> {
        let document = TestFixtures::config_document(dir, command_template, channels);
        let path = TestFixtures::write_config(dir, &document);
        Fleet::load(Arc::new(JsonConfigStore::new(path))).await.unwrap()
    }

    /// Poll until channel `id` reports `status`
    pub async fn wait_for(fleet: &Fleet, id: ChannelId, status: ChannelStatus) {
        let reached = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if fleet.channel(id).unwrap().status() == status {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(
            reached.is_ok(),
            "channel {} never reached {}, stuck at {}",
            id,
            status,
            fleet.channel(id).unwrap().status()
        );
    }
}
