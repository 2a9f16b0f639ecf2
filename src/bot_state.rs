use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use teloxide::types::ChatId;
use tokio::sync::RwLock;

use crate::catalog::{CatalogSnapshot, CatalogSource};
use crate::models::Session;
use crate::orders::OrderLifecycle;

/// Sessions idle longer than this are swept by the background task.
const SESSION_TTL_HOURS: i64 = 24;

type SessionMap = Arc<RwLock<HashMap<ChatId, Session>>>;
type SnapshotSlot = Arc<RwLock<Option<Arc<CatalogSnapshot>>>>;

/// Shared process state handed to every handler through dptree.
#[derive(Clone)]
pub struct AppState {
    source: Arc<dyn CatalogSource>,
    catalog: SnapshotSlot,
    sessions: SessionMap,
    pub lifecycle: Arc<OrderLifecycle>,
}

impl AppState {
    pub fn new(source: Arc<dyn CatalogSource>, lifecycle: Arc<OrderLifecycle>) -> Self {
        Self {
            source,
            catalog: Arc::new(RwLock::new(None)),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            lifecycle,
        }
    }

    /// Current published snapshot, if any reload has ever succeeded.
    /// Readers dereference once per operation; a concurrent reload only
    /// swaps the inner `Arc`.
    pub async fn snapshot(&self) -> Option<Arc<CatalogSnapshot>> {
        self.catalog.read().await.clone()
    }

    /// Full catalog rebuild. On any source error the previous snapshot
    /// stays authoritative; a partial index is never published.
    pub async fn reload_catalog(&self) -> anyhow::Result<usize> {
        let rows = self.source.read_all().await?;
        let snapshot = CatalogSnapshot::load(rows);
        if snapshot.is_empty() {
            log::warn!("catalog reload produced an empty snapshot");
        }
        let count = snapshot.book_count();
        *self.catalog.write().await = Some(Arc::new(snapshot));
        log::info!("catalog reloaded: {count} titles");
        Ok(count)
    }

    pub async fn session(&self, chat_id: ChatId) -> Session {
        self.sessions
            .read()
            .await
            .get(&chat_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn put_session(&self, chat_id: ChatId, session: Session) {
        self.sessions.write().await.insert(chat_id, session);
    }

    pub async fn clear_session(&self, chat_id: ChatId) {
        self.sessions.write().await.remove(&chat_id);
    }

    pub async fn sweep_idle_sessions(&self) {
        let cutoff = Utc::now() - Duration::hours(SESSION_TTL_HOURS);
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_activity > cutoff);
        if sessions.len() != before {
            log::debug!("sessions swept: {} -> {}", before, sessions.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogRow, CatalogSourceError};
    use crate::orders::tests::{CountingNotifier, FlakyProcessor, MemLedger};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    struct ScriptedSource {
        responses: Mutex<Vec<Result<Vec<CatalogRow>, CatalogSourceError>>>,
    }

    #[async_trait]
    impl CatalogSource for ScriptedSource {
        async fn read_all(&self) -> Result<Vec<CatalogRow>, CatalogSourceError> {
            self.responses
                .lock()
                .unwrap()
                .remove(0)
        }
    }

    fn state(responses: Vec<Result<Vec<CatalogRow>, CatalogSourceError>>) -> AppState {
        let lifecycle = Arc::new(OrderLifecycle::new(
            Arc::new(MemLedger::new()),
            Arc::new(FlakyProcessor {
                fail: false,
                issued: AtomicUsize::new(0),
            }),
            Arc::new(CountingNotifier {
                paid: AtomicUsize::new(0),
            }),
        ));
        AppState::new(
            Arc::new(ScriptedSource {
                responses: Mutex::new(responses),
            }),
            lifecycle,
        )
    }

    fn row(title: &str) -> CatalogRow {
        CatalogRow {
            location: Some("Кав'ярня A".to_string()),
            genre: Some("Роман".to_string()),
            author: None,
            title: Some(title.to_string()),
            description: None,
            price_by_duration: None,
        }
    }

    #[tokio::test]
    async fn failed_reload_keeps_the_previous_snapshot() {
        // Scenario C: navigation stays functional on the old snapshot.
        let state = state(vec![
            Ok(vec![row("Дюна")]),
            Err(CatalogSourceError::Unreachable(sqlx::Error::PoolClosed)),
        ]);

        state.reload_catalog().await.unwrap();
        let first = state.snapshot().await.unwrap();
        assert_eq!(first.book_count(), 1);

        assert!(state.reload_catalog().await.is_err());
        let still = state.snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&first, &still));
        assert!(still.book("Дюна").is_some());
    }

    #[tokio::test]
    async fn no_snapshot_until_a_reload_succeeds() {
        let state = state(vec![Err(CatalogSourceError::Unreachable(
            sqlx::Error::PoolClosed,
        ))]);
        assert!(state.reload_catalog().await.is_err());
        assert!(state.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn idle_sessions_are_swept() {
        let state = state(vec![]);
        let mut stale = Session::default();
        stale.last_activity = Utc::now() - Duration::hours(48);
        state.put_session(ChatId(1), stale).await;
        state.put_session(ChatId(2), Session::default()).await;

        state.sweep_idle_sessions().await;
        let sessions = state.sessions.read().await;
        assert!(!sessions.contains_key(&ChatId(1)));
        assert!(sessions.contains_key(&ChatId(2)));
    }
}
