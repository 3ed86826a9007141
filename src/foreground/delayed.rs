//! Present messages held back while the host cannot show anything.
//!
//! Messages are kept in arrival order, each tagged with the survival store
//! that was bound when it was held back. The dispatcher takes the whole queue
//! when the host becomes available again and feeds every entry back through
//! its normal delivery decision.

use crate::foreground::host::SurvivalStoreId;
use crate::foreground::registry::RequestId;
use crate::foreground::request::RequestDescriptor;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayedMessage {
    pub store: SurvivalStoreId,
    pub descriptor: RequestDescriptor,
}

impl DelayedMessage {
    pub fn new(store: SurvivalStoreId, descriptor: RequestDescriptor) -> Self {
        Self { store, descriptor }
    }

    pub fn id(&self) -> RequestId {
        self.descriptor.id()
    }
}

#[derive(Debug, Default)]
pub struct DelayedMessages {
    queue: VecDeque<DelayedMessage>,
}

impl DelayedMessages {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn push(&mut self, message: DelayedMessage) {
        self.queue.push_back(message);
    }

    /// Drop the message for `id`, if one is queued.
    pub fn remove(&mut self, id: RequestId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|m| m.id() != id);
        self.queue.len() != before
    }

    pub fn ids(&self) -> Vec<RequestId> {
        self.queue.iter().map(DelayedMessage::id).collect()
    }

    pub fn take_all(&mut self) -> VecDeque<DelayedMessage> {
        std::mem::take(&mut self.queue)
    }

    /// Remove and return the messages held back under `store`, keeping the
    /// rest in order.
    pub fn take_store(&mut self, store: SurvivalStoreId) -> Vec<DelayedMessage> {
        let (taken, kept): (Vec<_>, Vec<_>) =
            self.take_all().into_iter().partition(|m| m.store == store);
        self.queue = kept.into();
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foreground::registry::RequestRegistry;
    use crate::foreground::request::{ChallengeTokenRequest, RequestKind, RequestPayload};

    fn descriptor(registry: &RequestRegistry) -> RequestDescriptor {
        let request = registry.put(RequestKind::ChallengeToken);
        RequestDescriptor::new(
            request.id(),
            RequestPayload::ChallengeToken(ChallengeTokenRequest {
                challenge_type: "turnstile".into(),
                site_key: "key".into(),
                referer: "https://example.org".into(),
                description: None,
            }),
        )
    }

    #[test]
    fn take_all_preserves_arrival_order() {
        let registry = RequestRegistry::new();
        let mut delayed = DelayedMessages::new();
        let store = SurvivalStoreId::next();
        let descriptors: Vec<_> = (0..4).map(|_| descriptor(&registry)).collect();
        for d in &descriptors {
            delayed.push(DelayedMessage::new(store, d.clone()));
        }
        let drained: Vec<_> = delayed.take_all().into_iter().map(|m| m.id()).collect();
        let expected: Vec<_> = descriptors.iter().map(RequestDescriptor::id).collect();
        assert_eq!(drained, expected);
        assert!(delayed.is_empty());
    }

    #[test]
    fn remove_drops_only_matching_message() {
        let registry = RequestRegistry::new();
        let mut delayed = DelayedMessages::new();
        let store = SurvivalStoreId::next();
        let a = descriptor(&registry);
        let b = descriptor(&registry);
        delayed.push(DelayedMessage::new(store, a.clone()));
        delayed.push(DelayedMessage::new(store, b.clone()));
        assert!(delayed.remove(a.id()));
        assert!(!delayed.remove(a.id()));
        assert_eq!(delayed.ids(), vec![b.id()]);
        assert_eq!(delayed.len(), 1);
    }

    #[test]
    fn take_store_leaves_other_stores_in_order() {
        let registry = RequestRegistry::new();
        let mut delayed = DelayedMessages::new();
        let old = SurvivalStoreId::next();
        let new = SurvivalStoreId::next();
        let d: Vec<_> = (0..4).map(|_| descriptor(&registry)).collect();
        delayed.push(DelayedMessage::new(old, d[0].clone()));
        delayed.push(DelayedMessage::new(new, d[1].clone()));
        delayed.push(DelayedMessage::new(old, d[2].clone()));
        delayed.push(DelayedMessage::new(new, d[3].clone()));

        let taken: Vec<_> = delayed.take_store(old).iter().map(DelayedMessage::id).collect();
        assert_eq!(taken, vec![d[0].id(), d[2].id()]);
        assert_eq!(delayed.ids(), vec![d[1].id(), d[3].id()]);
        assert!(delayed.take_store(old).is_empty());
    }
}
