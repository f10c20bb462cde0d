//! Link moderation: delete, warn, and remove repeat offenders.

use super::links::{contains_link, find_links};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use warden_core::{
    config::ModerationConfig,
    message::GroupMessage,
    traits::{GroupClient, WarningStore},
    warning::WarningRecord,
};

/// What happened to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not ours to moderate (wrong chat, own message, exempt, no link).
    Ignored,
    /// Revoke failed; nothing recorded.
    DeleteFailed,
    /// Warning backend read/write failed; moderation stopped there.
    StoreFailed,
    /// Warned with the new count.
    Warned(u32),
    /// Threshold reached; record cleared and removal attempted.
    Banned,
}

pub struct Moderator {
    client: Arc<dyn GroupClient>,
    warnings: Arc<dyn WarningStore>,
    config: ModerationConfig,
    /// One lock per sender so a user's offenses are counted one at a time.
    sender_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Moderator {
    pub fn new(
        client: Arc<dyn GroupClient>,
        warnings: Arc<dyn WarningStore>,
        config: ModerationConfig,
    ) -> Self {
        Self {
            client,
            warnings,
            config,
            sender_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Whether this message falls under the link policy.
    pub fn applies_to(&self, msg: &GroupMessage) -> bool {
        msg.is_group
            && !msg.from_me
            && msg.chat == self.config.group_jid
            && !self.is_exempt(msg)
            && contains_link(&msg.text)
    }

    fn is_exempt(&self, msg: &GroupMessage) -> bool {
        let user = msg.sender_user();
        self.config
            .exempt_users
            .iter()
            .any(|u| u == user || *u == msg.sender)
    }

    /// Handle one incoming message end to end.
    pub async fn handle(&self, msg: GroupMessage) -> Outcome {
        if !self.applies_to(&msg) {
            return Outcome::Ignored;
        }

        let lock = self.sender_lock(&msg.sender).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.moderate(&msg).await
        };
        drop(lock);
        self.release_sender_lock(&msg.sender).await;
        outcome
    }

    async fn sender_lock(&self, sender: &str) -> Arc<Mutex<()>> {
        self.sender_locks
            .lock()
            .await
            .entry(sender.to_string())
            .or_default()
            .clone()
    }

    async fn release_sender_lock(&self, sender: &str) {
        let mut locks = self.sender_locks.lock().await;
        if locks
            .get(sender)
            .is_some_and(|l| Arc::strong_count(l) == 1)
        {
            locks.remove(sender);
        }
    }

    fn random_delay(&self) -> Duration {
        let min = self.config.min_delay_secs;
        let max = self.config.max_delay_secs.max(min);
        Duration::from_secs(rand::thread_rng().gen_range(min..=max))
    }

    async fn moderate(&self, msg: &GroupMessage) -> Outcome {
        let delay = self.random_delay();
        info!(
            "link from {} in {}: {:?}, acting in {}s",
            msg.sender,
            msg.chat,
            find_links(&msg.text),
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;

        if let Err(e) = self.client.delete_message(msg).await {
            warn!("failed to delete message {} from {}: {e}", msg.id, msg.sender);
            return Outcome::DeleteFailed;
        }

        let mut record = match self.warnings.get_warning(&msg.sender).await {
            Ok(Some(record)) => record,
            Ok(None) => WarningRecord::new(&msg.sender),
            Err(e) => {
                error!("failed to read warnings for {}: {e}", msg.sender);
                return Outcome::StoreFailed;
            }
        };
        let count = record.increment();
        let threshold = self.config.warn_threshold;
        let user = msg.display_name();

        if count < threshold {
            if let Err(e) = self.warnings.save_warning(&record).await {
                error!("failed to save warning for {}: {e}", msg.sender);
                return Outcome::StoreFailed;
            }
            let text = render(&self.config.warning_template, &user, count, threshold);
            if let Err(e) = self.client.send_text(&msg.chat, &text).await {
                warn!("failed to send warning to {}: {e}", msg.sender);
            }
            info!("warned {} ({count}/{threshold})", msg.sender);
            return Outcome::Warned(count);
        }

        let text = render(&self.config.ban_template, &user, count, threshold);
        if let Err(e) = self.client.send_text(&msg.chat, &text).await {
            warn!("failed to send ban notice for {}: {e}", msg.sender);
        }
        if let Err(e) = self.warnings.delete_warning(&msg.sender).await {
            error!("failed to clear warnings for {}: {e}", msg.sender);
            return Outcome::StoreFailed;
        }
        match self
            .client
            .remove_participant(&msg.chat, &msg.sender)
            .await
        {
            Ok(()) => info!("removed {} from {} after {count} warnings", msg.sender, msg.chat),
            Err(e) => error!("failed to remove {} from {}: {e}", msg.sender, msg.chat),
        }
        Outcome::Banned
    }
}

/// Fill `{user}`, `{count}` and `{threshold}` in a template.
pub fn render(template: &str, user: &str, count: u32, threshold: u32) -> String {
    template
        .replace("{user}", user)
        .replace("{count}", &count.to_string())
        .replace("{threshold}", &threshold.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use warden_core::error::WardenError;

    const GROUP: &str = "120363001234567890@g.us";
    const SPAMMER: &str = "5511999887766@s.whatsapp.net";

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Delete(String),
        Send(String, String),
        Remove(String, String),
    }

    #[derive(Default)]
    struct MockClient {
        calls: std::sync::Mutex<Vec<Call>>,
        fail_delete: bool,
    }

    impl MockClient {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GroupClient for MockClient {
        async fn send_text(&self, chat: &str, text: &str) -> Result<String, WardenError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Send(chat.to_string(), text.to_string()));
            Ok("SENT".to_string())
        }

        async fn delete_message(&self, message: &GroupMessage) -> Result<(), WardenError> {
            if self.fail_delete {
                return Err(WardenError::Channel("not an admin".into()));
            }
            self.calls
                .lock()
                .unwrap()
                .push(Call::Delete(message.id.clone()));
            Ok(())
        }

        async fn remove_participant(
            &self,
            group: &str,
            participant: &str,
        ) -> Result<(), WardenError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Remove(group.to_string(), participant.to_string()));
            Ok(())
        }

        async fn is_connected(&self) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct MockStore {
        records: std::sync::Mutex<HashMap<String, WarningRecord>>,
        fail: bool,
        fail_save: bool,
        fail_delete: bool,
    }

    impl MockStore {
        fn count(&self, user: &str) -> Option<u32> {
            self.records.lock().unwrap().get(user).map(|r| r.warn_count)
        }
    }

    #[async_trait]
    impl WarningStore for MockStore {
        async fn get_warning(&self, user_id: &str) -> Result<Option<WarningRecord>, WardenError> {
            if self.fail {
                return Err(WardenError::Store("backend down".into()));
            }
            Ok(self.records.lock().unwrap().get(user_id).cloned())
        }

        async fn save_warning(&self, record: &WarningRecord) -> Result<(), WardenError> {
            if self.fail_save {
                return Err(WardenError::Store("write rejected".into()));
            }
            self.records
                .lock()
                .unwrap()
                .insert(record.user_id.clone(), record.clone());
            Ok(())
        }

        async fn delete_warning(&self, user_id: &str) -> Result<(), WardenError> {
            if self.fail_delete {
                return Err(WardenError::Store("write rejected".into()));
            }
            self.records.lock().unwrap().remove(user_id);
            Ok(())
        }
    }

    fn config() -> ModerationConfig {
        ModerationConfig {
            group_jid: GROUP.to_string(),
            min_delay_secs: 0,
            max_delay_secs: 0,
            ..Default::default()
        }
    }

    fn link_msg(id: &str) -> GroupMessage {
        GroupMessage {
            id: id.to_string(),
            chat: GROUP.to_string(),
            sender: SPAMMER.to_string(),
            sender_name: Some("Spammer".to_string()),
            text: "buy now https://scam.example".to_string(),
            from_me: false,
            is_group: true,
            timestamp: Utc::now(),
        }
    }

    fn moderator(client: Arc<MockClient>, store: Arc<MockStore>, cfg: ModerationConfig) -> Moderator {
        Moderator::new(client, store, cfg)
    }

    #[test]
    fn test_render_placeholders() {
        assert_eq!(
            render("{user} {count}/{threshold}", "@5511", 2, 3),
            "@5511 2/3"
        );
    }

    #[tokio::test]
    async fn test_warns_below_threshold_then_bans_once() {
        let client = Arc::new(MockClient::default());
        let store = Arc::new(MockStore::default());
        let m = moderator(client.clone(), store.clone(), config());

        assert_eq!(m.handle(link_msg("m1")).await, Outcome::Warned(1));
        assert_eq!(store.count(SPAMMER), Some(1));
        assert_eq!(m.handle(link_msg("m2")).await, Outcome::Warned(2));
        assert_eq!(store.count(SPAMMER), Some(2));
        assert_eq!(m.handle(link_msg("m3")).await, Outcome::Banned);
        assert_eq!(store.count(SPAMMER), None);

        let calls = client.calls();
        let removals: Vec<_> = calls
            .iter()
            .filter(|c| matches!(c, Call::Remove(..)))
            .collect();
        assert_eq!(removals.len(), 1);
        assert_eq!(
            calls.last(),
            Some(&Call::Remove(GROUP.to_string(), SPAMMER.to_string()))
        );
        let Call::Send(_, ban_text) = &calls[calls.len() - 2] else {
            panic!("ban notice should precede removal: {calls:?}");
        };
        assert!(ban_text.contains("Spammer"));
        assert!(ban_text.contains('3'));
    }

    #[tokio::test]
    async fn test_warning_text_uses_template() {
        let client = Arc::new(MockClient::default());
        let store = Arc::new(MockStore::default());
        let cfg = ModerationConfig {
            warning_template: "{user}: {count} of {threshold}".to_string(),
            ..config()
        };
        moderator(client.clone(), store, cfg)
            .handle(link_msg("m1"))
            .await;
        assert_eq!(
            client.calls(),
            vec![
                Call::Delete("m1".to_string()),
                Call::Send(GROUP.to_string(), "Spammer: 1 of 3".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_threshold_one_bans_immediately() {
        let client = Arc::new(MockClient::default());
        let store = Arc::new(MockStore::default());
        let cfg = ModerationConfig {
            warn_threshold: 1,
            ..config()
        };
        let m = moderator(client.clone(), store.clone(), cfg);
        assert_eq!(m.handle(link_msg("m1")).await, Outcome::Banned);
        assert_eq!(store.count(SPAMMER), None);
    }

    #[tokio::test]
    async fn test_delete_failure_records_nothing() {
        let client = Arc::new(MockClient {
            fail_delete: true,
            ..Default::default()
        });
        let store = Arc::new(MockStore::default());
        let m = moderator(client.clone(), store.clone(), config());

        assert_eq!(m.handle(link_msg("m1")).await, Outcome::DeleteFailed);
        assert_eq!(store.count(SPAMMER), None);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_sends_nothing() {
        let client = Arc::new(MockClient::default());
        let store = Arc::new(MockStore {
            fail: true,
            ..Default::default()
        });
        let m = moderator(client.clone(), store, config());

        assert_eq!(m.handle(link_msg("m1")).await, Outcome::StoreFailed);
        assert_eq!(client.calls(), vec![Call::Delete("m1".to_string())]);
    }

    #[tokio::test]
    async fn test_save_failure_sends_no_warning() {
        let client = Arc::new(MockClient::default());
        let store = Arc::new(MockStore {
            fail_save: true,
            ..Default::default()
        });
        let m = moderator(client.clone(), store.clone(), config());

        assert_eq!(m.handle(link_msg("m1")).await, Outcome::StoreFailed);
        assert_eq!(store.count(SPAMMER), None);
        assert_eq!(client.calls(), vec![Call::Delete("m1".to_string())]);
    }

    #[tokio::test]
    async fn test_record_delete_failure_skips_removal() {
        let client = Arc::new(MockClient::default());
        let store = Arc::new(MockStore {
            fail_delete: true,
            ..Default::default()
        });
        store
            .records
            .lock()
            .unwrap()
            .insert(SPAMMER.to_string(), {
                let mut record = WarningRecord::new(SPAMMER);
                record.increment();
                record.increment();
                record
            });
        let m = moderator(client.clone(), store.clone(), config());

        assert_eq!(m.handle(link_msg("m3")).await, Outcome::StoreFailed);
        let calls = client.calls();
        assert!(!calls.iter().any(|c| matches!(c, Call::Remove(..))));
        assert_eq!(calls[0], Call::Delete("m3".to_string()));
        assert!(matches!(&calls[1], Call::Send(chat, _) if chat == GROUP));
        assert_eq!(calls.len(), 2);
        // The record survives, so the next offense triggers the ban again.
        assert_eq!(store.count(SPAMMER), Some(2));
    }

    #[test]
    fn test_random_delay_within_bounds() {
        let cfg = ModerationConfig {
            min_delay_secs: 20,
            max_delay_secs: 45,
            ..config()
        };
        let m = moderator(
            Arc::new(MockClient::default()),
            Arc::new(MockStore::default()),
            cfg,
        );
        for _ in 0..200 {
            let secs = m.random_delay().as_secs();
            assert!((20..=45).contains(&secs), "delay {secs}s out of range");
        }
    }

    #[test]
    fn test_random_delay_with_inverted_range_uses_min() {
        let cfg = ModerationConfig {
            min_delay_secs: 30,
            max_delay_secs: 10,
            ..config()
        };
        let m = moderator(
            Arc::new(MockClient::default()),
            Arc::new(MockStore::default()),
            cfg,
        );
        assert_eq!(m.random_delay().as_secs(), 30);
    }

    #[tokio::test]
    async fn test_ignores_self_other_chats_clean_text_and_exempt() {
        let client = Arc::new(MockClient::default());
        let store = Arc::new(MockStore::default());
        let cfg = ModerationConfig {
            exempt_users: vec!["5511000000000".to_string()],
            ..config()
        };
        let m = moderator(client.clone(), store, cfg);

        let mut own = link_msg("a");
        own.from_me = true;
        let mut elsewhere = link_msg("b");
        elsewhere.chat = "120363999999999999@g.us".to_string();
        let mut clean = link_msg("c");
        clean.text = "no links here".to_string();
        let mut admin = link_msg("d");
        admin.sender = "5511000000000@s.whatsapp.net".to_string();
        let mut direct = link_msg("e");
        direct.is_group = false;

        for msg in [own, elsewhere, clean, admin, direct] {
            assert_eq!(m.handle(msg).await, Outcome::Ignored);
        }
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_links_from_same_sender_count_serially() {
        let client = Arc::new(MockClient::default());
        let store = Arc::new(MockStore::default());
        let m = Arc::new(moderator(client, store.clone(), config()));

        let handles: Vec<_> = (0..2)
            .map(|i| {
                let m = m.clone();
                tokio::spawn(async move { m.handle(link_msg(&format!("m{i}"))).await })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(store.count(SPAMMER), Some(2));
        assert!(m.sender_locks.lock().await.is_empty());
    }
}
