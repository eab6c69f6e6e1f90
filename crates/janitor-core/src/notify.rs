use crossbeam_channel::{unbounded, Receiver, Sender};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;

/// A mutation of an owner's persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    FilesChanged {
        owner_id: String,
        count: usize,
    },
    AnalysisCompleted {
        owner_id: String,
        files: usize,
        recommendations: usize,
    },
    AnalysisFailed {
        owner_id: String,
        error: String,
    },
    FilesDeleted {
        owner_id: String,
        count: usize,
    },
}

impl Change {
    pub fn owner_id(&self) -> &str {
        match self {
            Change::FilesChanged { owner_id, .. }
            | Change::AnalysisCompleted { owner_id, .. }
            | Change::AnalysisFailed { owner_id, .. }
            | Change::FilesDeleted { owner_id, .. } => owner_id,
        }
    }
}

/// Per-owner change feed. Cloning shares the subscriber registry.
#[derive(Clone, Default)]
pub struct ChangeNotifier {
    subscribers: Arc<DashMap<String, Vec<Sender<Change>>>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, owner_id: &str) -> Receiver<Change> {
        let (tx, rx) = unbounded();
        self.subscribers
            .entry(owner_id.to_string())
            .or_default()
            .push(tx);
        rx
    }

    /// Deliver to every live subscriber of the change's owner. Subscribers
    /// whose receiver was dropped are removed.
    pub fn publish(&self, change: Change) {
        if let Some(mut senders) = self.subscribers.get_mut(change.owner_id()) {
            senders.retain(|tx| tx.send(change.clone()).is_ok());
            trace!("Published {:?} to {} subscriber(s)", change, senders.len());
        }
    }

    pub fn subscriber_count(&self, owner_id: &str) -> usize {
        self.subscribers
            .get(owner_id)
            .map(|senders| senders.len())
            .unwrap_or(0)
    }
}
