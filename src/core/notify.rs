// src/core/notify.rs
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 64;
const RECENT_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A short-lived user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: Option<String>,
}

impl Notice {
    pub fn info(title: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            description: None,
        }
    }

    pub fn success(title: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            description: None,
        }
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A notice as kept for polling front ends. Ids increase by one per notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostedNotice {
    pub id: u64,
    pub posted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub notice: Notice,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

struct RecentNotices {
    next_id: u64,
    entries: VecDeque<PostedNotice>,
}

/// Fan-out of notices to live subscribers, plus a bounded backlog of the most
/// recent ones for front ends that poll.
pub struct NotificationCenter {
    sender: broadcast::Sender<Notice>,
    recent: Mutex<RecentNotices>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            recent: Mutex::new(RecentNotices {
                next_id: 1,
                entries: VecDeque::with_capacity(RECENT_CAPACITY),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    /// Backlogged notices with an id greater than `after`, oldest first.
    pub fn recent(&self, after: Option<u64>) -> Vec<PostedNotice> {
        let after = after.unwrap_or(0);
        self.recent
            .lock()
            .entries
            .iter()
            .filter(|posted| posted.id > after)
            .cloned()
            .collect()
    }

    fn remember(&self, notice: &Notice) {
        let mut recent = self.recent.lock();
        if recent.entries.len() == RECENT_CAPACITY {
            recent.entries.pop_front();
        }
        let id = recent.next_id;
        recent.next_id += 1;
        recent.entries.push_back(PostedNotice {
            id,
            posted_at: Utc::now(),
            notice: notice.clone(),
        });
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NotificationCenter {
    fn notify(&self, notice: Notice) {
        debug!("Notice [{:?}] {}", notice.level, notice.title);
        self.remember(&notice);
        let _ = self.sender.send(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_receive_notices() {
        let center = NotificationCenter::new();
        let mut rx = center.subscribe();

        center.notify(Notice::error("Transaction failed").with_description("rejected"));

        let notice = rx.try_recv().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.description.as_deref(), Some("rejected"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_notify_without_subscribers_is_harmless() {
        NotificationCenter::new().notify(Notice::info("Wallet disconnected"));
    }

    #[test]
    fn test_recent_keeps_a_bounded_backlog() {
        let center = NotificationCenter::new();
        center.notify(Notice::success("Wallet connected successfully!"));
        center.notify(Notice::info("Wallet disconnected"));

        let all = center.recent(None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, 1);
        assert_eq!(all[0].notice.title, "Wallet connected successfully!");
        assert_eq!(center.recent(Some(1)).len(), 1);
        assert!(center.recent(Some(2)).is_empty());

        for n in 0..RECENT_CAPACITY {
            center.notify(Notice::info(format!("notice {}", n)));
        }
        let kept = center.recent(None);
        assert_eq!(kept.len(), RECENT_CAPACITY);
        assert_eq!(kept[0].id, 3);
        assert_eq!(kept.last().unwrap().id, (RECENT_CAPACITY + 2) as u64);
    }
}
