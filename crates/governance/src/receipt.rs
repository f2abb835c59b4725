//! Receipts: the immutable audit record emitted per governed
//! execution, routed to one of two sinks by tier.

use cplane_core::RiskTier;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub receipt_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub connector_id: String,
    pub operation_id: String,
    pub capability: String,
    pub tier: RiskTier,
    pub status_code: u16,
    pub success: bool,
}

impl Receipt {
    pub fn new(
        connector_id: &str,
        operation_id: &str,
        capability: &str,
        tier: RiskTier,
        status_code: u16,
        success: bool,
    ) -> Self {
        Self {
            receipt_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now(),
            connector_id: connector_id.to_string(),
            operation_id: operation_id.to_string(),
            capability: capability.to_string(),
            tier,
            status_code,
            success,
        }
    }
}

/// T0 receipts accumulate here; a timer-driven drainer (not modeled by
/// this type) calls [`flush`](Self::flush) every
/// `flush_interval_seconds`, or [`push`](Self::push) self-drains once
/// `buffer_size` is reached.
pub struct BatchReceiptBuffer {
    buffer: Mutex<VecDeque<Receipt>>,
    buffer_size: usize,
}

impl BatchReceiptBuffer {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer: Mutex::new(VecDeque::new()),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Push a receipt. Returns the drained batch if this push filled
    /// the buffer to capacity.
    pub fn push(&self, receipt: Receipt) -> Option<Vec<Receipt>> {
        let mut buffer = self.buffer.lock().unwrap();
        buffer.push_back(receipt);
        if buffer.len() >= self.buffer_size {
            Some(buffer.drain(..).collect())
        } else {
            None
        }
    }

    /// Drain whatever is buffered, regardless of size. Called by the
    /// timer-driven flush.
    pub fn flush(&self) -> Vec<Receipt> {
        self.buffer.lock().unwrap().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// T1+ receipts land here immediately. An in-memory append-only store;
/// durable backing is an onboarding/control-plane concern out of scope
/// here.
pub struct ReceiptStore {
    receipts: Mutex<Vec<Receipt>>,
}

impl ReceiptStore {
    pub fn new() -> Self {
        Self {
            receipts: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, receipt: Receipt) {
        self.receipts.lock().unwrap().push(receipt);
    }

    pub fn all(&self) -> Vec<Receipt> {
        self.receipts.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.receipts.lock().unwrap().len()
    }
}

impl Default for ReceiptStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes a receipt to the batch buffer (T0) or the receipt store
/// (T1/T2/T3).
pub struct ReceiptRouter {
    pub batch: BatchReceiptBuffer,
    pub store: ReceiptStore,
}

impl ReceiptRouter {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            batch: BatchReceiptBuffer::new(buffer_size),
            store: ReceiptStore::new(),
        }
    }

    /// Route the receipt. Returns a drained batch if routing to the
    /// batch buffer just filled it.
    pub fn route(&self, receipt: Receipt) -> Option<Vec<Receipt>> {
        if receipt.tier == RiskTier::T0Inert {
            self.batch.push(receipt)
        } else {
            self.store.record(receipt);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(tier: RiskTier) -> Receipt {
        Receipt::new("slack", "post_message", "connector.slack.post_message", tier, 200, true)
    }

    #[test]
    fn t0_receipts_route_to_batch_buffer() {
        let router = ReceiptRouter::new(10);
        router.route(receipt(RiskTier::T0Inert));
        assert_eq!(router.batch.len(), 1);
        assert_eq!(router.store.len(), 0);
    }

    #[test]
    fn t1_and_above_route_to_store_immediately() {
        let router = ReceiptRouter::new(10);
        router.route(receipt(RiskTier::T1Reversible));
        router.route(receipt(RiskTier::T2Controlled));
        router.route(receipt(RiskTier::T3Irreversible));
        assert_eq!(router.store.len(), 3);
        assert_eq!(router.batch.len(), 0);
    }

    #[test]
    fn batch_buffer_self_drains_at_capacity() {
        let buffer = BatchReceiptBuffer::new(2);
        assert!(buffer.push(receipt(RiskTier::T0Inert)).is_none());
        let drained = buffer.push(receipt(RiskTier::T0Inert));
        assert_eq!(drained.unwrap().len(), 2);
        assert!(buffer.is_empty());
    }

    #[test]
    fn flush_drains_regardless_of_size() {
        let buffer = BatchReceiptBuffer::new(10);
        buffer.push(receipt(RiskTier::T0Inert));
        buffer.push(receipt(RiskTier::T0Inert));
        let flushed = buffer.flush();
        assert_eq!(flushed.len(), 2);
        assert!(buffer.is_empty());
    }

    #[test]
    fn receipt_ids_are_unique() {
        let a = receipt(RiskTier::T0Inert);
        let b = receipt(RiskTier::T0Inert);
        assert_ne!(a.receipt_id, b.receipt_id);
    }
}
