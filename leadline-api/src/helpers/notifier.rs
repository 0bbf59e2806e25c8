use shared_types::ContactNotice;
use tokio::sync::broadcast;

/// Outbound seam to the real-time presence/notification channel.
pub trait Notifier: Send + Sync {
    fn publish(&self, notice: ContactNotice);
}

/// In-process fan-out; whatever bridges to the real-time channel subscribes.
pub struct BroadcastNotifier {
    sender: broadcast::Sender<ContactNotice>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContactNotice> {
        self.sender.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn publish(&self, notice: ContactNotice) {
        // No subscriber is not an error
        if self.sender.send(notice).is_err() {
            tracing::trace!("Contact notice dropped, no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{ContactStatus, NoticeKind};

    #[tokio::test]
    async fn test_subscribers_receive_notices() {
        let notifier = BroadcastNotifier::new(8);
        let mut rx = notifier.subscribe();

        let notice = ContactNotice {
            contact_id: 3,
            status: ContactStatus::New,
            assigned_agent_id: Some(1),
            kind: NoticeKind::Claimed,
        };
        notifier.publish(notice.clone());

        assert_eq!(rx.recv().await.unwrap(), notice);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let notifier = BroadcastNotifier::new(1);
        notifier.publish(ContactNotice {
            contact_id: 1,
            status: ContactStatus::Nrp,
            assigned_agent_id: None,
            kind: NoticeKind::Recycled,
        });
    }
}
