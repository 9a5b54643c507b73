//! In-memory projection of every donor-organization chat thread, plus the
//! derived unread set.
//!
//! The dashboard this replaces kept one store listener per thread, frozen at
//! mount time, so threads created later stayed invisible until a full page
//! reload. Here the index is a single subscription manager: it applies
//! `ThreadUpdate` events from the dispatcher as they arrive and reconciles
//! against the store on a timer, so added and removed threads converge
//! without a restart.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use farmaid_db::Database;
use farmaid_types::events::GatewayEvent;
use farmaid_types::models::ChatThread;

use crate::dispatcher::Dispatcher;

/// How often the index re-reads the thread list to pick up writes that did
/// not flow through the dispatcher (imports, other processes).
const RECONCILE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct ThreadIndex {
    inner: Arc<RwLock<IndexInner>>,
}

#[derive(Default)]
struct IndexInner {
    threads: HashMap<String, ChatThread>,
    unread: HashSet<String>,
}

impl ThreadIndex {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(IndexInner::default())),
        }
    }

    /// Initial load: project every stored thread and derive the unread set.
    pub async fn load(&self, db: &Database) -> farmaid_db::Result<()> {
        let rows = db.list_threads()?;
        let mut inner = self.inner.write().await;
        inner.threads.clear();
        inner.unread.clear();
        for row in rows {
            let thread = row.into_thread();
            if thread.is_unread() {
                inner.unread.insert(thread.donor_id.clone());
            }
            inner.threads.insert(thread.donor_id.clone(), thread);
        }
        info!(
            "Thread index loaded: {} threads, {} unread",
            inner.threads.len(),
            inner.unread.len()
        );
        Ok(())
    }

    /// Apply one thread snapshot. Unread membership is only ever added here;
    /// removal happens exclusively through `mark_read`.
    pub async fn apply(&self, thread: ChatThread) {
        let mut inner = self.inner.write().await;
        if thread.is_unread() {
            inner.unread.insert(thread.donor_id.clone());
        }
        inner.threads.insert(thread.donor_id.clone(), thread);
    }

    /// Acknowledge a thread: drop it from the unread set and flip the local
    /// projection's read flag.
    pub async fn mark_read(&self, donor_id: &str) {
        let mut inner = self.inner.write().await;
        inner.unread.remove(donor_id);
        if let Some(thread) = inner.threads.get_mut(donor_id) {
            thread.read_by_admin = true;
        }
    }

    /// Replace the known thread set with a fresh store read. New threads are
    /// projected in, vanished threads (and their unread membership) drop out;
    /// unread membership for surviving threads is preserved.
    pub async fn reconcile(&self, threads: Vec<ChatThread>) {
        let mut inner = self.inner.write().await;
        let fresh_ids: HashSet<String> = threads.iter().map(|t| t.donor_id.clone()).collect();

        let before = inner.threads.len();
        inner.threads.retain(|id, _| fresh_ids.contains(id));
        inner.unread.retain(|id| fresh_ids.contains(id));

        for thread in threads {
            if thread.is_unread() {
                inner.unread.insert(thread.donor_id.clone());
            }
            inner.threads.insert(thread.donor_id.clone(), thread);
        }

        if inner.threads.len() != before {
            debug!(
                "Thread index reconciled: {} -> {} threads",
                before,
                inner.threads.len()
            );
        }
    }

    /// Sidebar snapshot: threads newest-first plus the unread ids.
    pub async fn snapshot(&self) -> (Vec<ChatThread>, Vec<String>) {
        let inner = self.inner.read().await;
        let mut threads: Vec<ChatThread> = inner.threads.values().cloned().collect();
        threads.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        let mut unread: Vec<String> = inner.unread.iter().cloned().collect();
        unread.sort();
        (threads, unread)
    }

    pub async fn unread_count(&self) -> usize {
        self.inner.read().await.unread.len()
    }

    /// Long-running maintenance task: initial load, then live updates from
    /// the dispatcher interleaved with periodic store reconciliation.
    pub async fn run(self, db: Arc<Database>, dispatcher: Dispatcher) {
        if let Err(e) = self.load(&db).await {
            warn!("Thread index initial load failed: {}", e);
        }

        let mut events = dispatcher.subscribe();
        let mut reconcile = tokio::time::interval(RECONCILE_INTERVAL);
        reconcile.tick().await;

        loop {
            tokio::select! {
                result = events.recv() => {
                    match result {
                        Ok(GatewayEvent::ThreadUpdate { thread }) => {
                            self.apply(thread).await;
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(n)) => {
                            warn!("Thread index lagged {} events, reconciling from store", n);
                            self.reconcile_from_store(&db).await;
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                _ = reconcile.tick() => {
                    self.reconcile_from_store(&db).await;
                }
            }
        }
    }

    async fn reconcile_from_store(&self, db: &Database) {
        match db.list_threads() {
            Ok(rows) => {
                let threads = rows.into_iter().map(|r| r.into_thread()).collect();
                self.reconcile(threads).await;
            }
            Err(e) => warn!("Thread index reconcile read failed: {}", e),
        }
    }
}

impl Default for ThreadIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use farmaid_types::models::Sender;

    use super::*;

    fn thread(donor_id: &str, from: Sender, read: bool) -> ChatThread {
        ChatThread {
            donor_id: donor_id.into(),
            donor_name: "Maria Santos".into(),
            last_message: "hello".into(),
            last_message_from: from,
            last_message_at: Some(Utc::now()),
            read_by_admin: read,
        }
    }

    #[tokio::test]
    async fn donor_messages_enter_the_unread_set() {
        let index = ThreadIndex::new();
        index.apply(thread("donor-42", Sender::Donor, false)).await;

        let (threads, unread) = index.snapshot().await;
        assert_eq!(threads.len(), 1);
        assert_eq!(unread, vec!["donor-42"]);
    }

    #[tokio::test]
    async fn admin_snapshots_do_not_remove_unread_membership() {
        // Removal is explicit: only mark_read clears the set.
        let index = ThreadIndex::new();
        index.apply(thread("donor-42", Sender::Donor, false)).await;
        index.apply(thread("donor-42", Sender::Admin, true)).await;

        let (_, unread) = index.snapshot().await;
        assert_eq!(unread, vec!["donor-42"]);

        index.mark_read("donor-42").await;
        let (threads, unread) = index.snapshot().await;
        assert!(unread.is_empty());
        assert!(threads[0].read_by_admin);
    }

    #[tokio::test]
    async fn selecting_a_thread_clears_it_from_the_unread_set() {
        let index = ThreadIndex::new();
        index.apply(thread("donor-42", Sender::Donor, false)).await;
        assert_eq!(index.unread_count().await, 1);

        index.mark_read("donor-42").await;
        assert_eq!(index.unread_count().await, 0);
    }

    #[tokio::test]
    async fn reconcile_picks_up_new_threads_and_drops_vanished_ones() {
        let index = ThreadIndex::new();
        index.apply(thread("donor-1", Sender::Donor, false)).await;
        index.apply(thread("donor-2", Sender::Admin, true)).await;

        index
            .reconcile(vec![
                thread("donor-2", Sender::Admin, true),
                thread("donor-3", Sender::Donor, false),
            ])
            .await;

        let (threads, unread) = index.snapshot().await;
        let ids: HashSet<_> = threads.iter().map(|t| t.donor_id.clone()).collect();
        assert!(ids.contains("donor-2"));
        assert!(ids.contains("donor-3"));
        assert!(!ids.contains("donor-1"));
        assert_eq!(unread, vec!["donor-3"]);
    }

    #[tokio::test]
    async fn reconcile_does_not_resurrect_acknowledged_threads() {
        let index = ThreadIndex::new();
        index.apply(thread("donor-1", Sender::Donor, false)).await;
        index.mark_read("donor-1").await;

        index
            .reconcile(vec![thread("donor-1", Sender::Donor, true)])
            .await;
        assert_eq!(index.unread_count().await, 0);
    }

    #[tokio::test]
    async fn initial_load_projects_the_store() {
        let db = Database::open_in_memory().unwrap();
        let msg = farmaid_types::models::ChatMessage {
            id: uuid::Uuid::new_v4(),
            thread_id: "donor-42".into(),
            text: Some("Is the delivery confirmed?".into()),
            image_url: None,
            sender: Sender::Donor,
            sender_name: "Maria Santos".into(),
            created_at: Utc::now(),
        };
        db.append_message(&msg, "Maria Santos").unwrap();

        let index = ThreadIndex::new();
        index.load(&db).await.unwrap();

        let (threads, unread) = index.snapshot().await;
        assert_eq!(threads.len(), 1);
        assert_eq!(unread, vec!["donor-42"]);
    }
}
