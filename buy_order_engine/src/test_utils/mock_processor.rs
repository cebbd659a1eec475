//! An in-memory stand-in for the card processor.
//!
//! The mock keeps payment intents in memory and honours idempotency keys the way the real processor does: replaying a
//! key returns the original response without touching the intent again. Tests can script the status new holds come
//! back with, and inject faults into the next call of each kind.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use bo_common::Cents;

use crate::traits::{HoldRequest, IntentInfo, IntentStatus, PaymentProcessor, ProcessorError};

/// A record of a call made to the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorCall {
    Hold { amount: Cents, platform_fee: Cents, destination: String, idempotency_key: String },
    Capture { intent_id: String, amount: Cents, platform_fee: Cents, idempotency_key: String },
    Cancel { intent_id: String, idempotency_key: String },
    Retrieve { intent_id: String },
    FindHold { ledger_entry_id: i64 },
}

/// What goes wrong on the next call of a kind.
#[derive(Debug, Clone)]
pub enum Fault {
    /// The processor refuses the request and nothing changes.
    Reject(ProcessorError),
    /// The request takes effect at the processor, but the response never arrives.
    LostResponse,
}

#[derive(Debug, Default)]
struct MockState {
    intents: HashMap<String, IntentInfo>,
    replies: HashMap<String, IntentInfo>,
    hold_status: Option<IntentStatus>,
    hold_fault: Option<Fault>,
    capture_fault: Option<Fault>,
    cancel_fault: Option<Fault>,
    calls: Vec<ProcessorCall>,
    counter: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MockProcessor {
    state: Arc<Mutex<MockState>>,
}

impl MockProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("MockProcessor state poisoned")
    }

    /// New holds come back in `status` instead of `requires_capture`.
    pub fn set_hold_status(&self, status: IntentStatus) {
        self.state().hold_status = Some(status);
    }

    pub fn fail_next_hold(&self, fault: Fault) {
        self.state().hold_fault = Some(fault);
    }

    pub fn fail_next_capture(&self, fault: Fault) {
        self.state().capture_fault = Some(fault);
    }

    pub fn fail_next_cancel(&self, fault: Fault) {
        self.state().cancel_fault = Some(fault);
    }

    /// Changes an intent behind the engine's back, e.g. to simulate a hold lapsing.
    pub fn set_intent_status(&self, intent_id: &str, status: IntentStatus) {
        if let Some(intent) = self.state().intents.get_mut(intent_id) {
            intent.status = status;
        }
    }

    pub fn intent(&self, intent_id: &str) -> Option<IntentInfo> {
        self.state().intents.get(intent_id).cloned()
    }

    pub fn calls(&self) -> Vec<ProcessorCall> {
        self.state().calls.clone()
    }

    pub fn captures(&self) -> Vec<ProcessorCall> {
        self.calls().into_iter().filter(|c| matches!(c, ProcessorCall::Capture { .. })).collect()
    }

    pub fn holds(&self) -> Vec<ProcessorCall> {
        self.calls().into_iter().filter(|c| matches!(c, ProcessorCall::Hold { .. })).collect()
    }

    pub fn cancels(&self) -> Vec<ProcessorCall> {
        self.calls().into_iter().filter(|c| matches!(c, ProcessorCall::Cancel { .. })).collect()
    }
}

/// Applies `fault` to the outcome of a call. `apply` performs the call's effect on the state.
fn with_fault<F>(state: &mut MockState, fault: Option<Fault>, key: &str, apply: F) -> Result<IntentInfo, ProcessorError>
where F: FnOnce(&mut MockState) -> Result<IntentInfo, ProcessorError> {
    if let Some(reply) = state.replies.get(key) {
        return Ok(reply.clone());
    }
    match fault {
        Some(Fault::Reject(e)) => Err(e),
        Some(Fault::LostResponse) => {
            let reply = apply(state)?;
            state.replies.insert(key.to_string(), reply);
            Err(ProcessorError::Unavailable("Connection reset".into()))
        },
        None => {
            let reply = apply(state)?;
            state.replies.insert(key.to_string(), reply.clone());
            Ok(reply)
        },
    }
}

impl PaymentProcessor for MockProcessor {
    async fn create_hold(&self, request: HoldRequest) -> Result<IntentInfo, ProcessorError> {
        let mut state = self.state();
        state.calls.push(ProcessorCall::Hold {
            amount: request.amount,
            platform_fee: request.platform_fee,
            destination: request.destination_account.clone(),
            idempotency_key: request.idempotency_key.clone(),
        });
        let fault = state.hold_fault.take();
        with_fault(&mut state, fault, &request.idempotency_key, |state| {
            state.counter += 1;
            let intent = IntentInfo {
                id: format!("pi_mock_{:04}", state.counter),
                status: state.hold_status.unwrap_or(IntentStatus::RequiresCapture),
                amount: request.amount,
                amount_received: Cents::default(),
                failure_message: None,
                ledger_entry_id: Some(request.ledger_entry_id),
            };
            state.intents.insert(intent.id.clone(), intent.clone());
            Ok(intent)
        })
    }

    async fn capture(
        &self,
        intent_id: &str,
        amount: Cents,
        platform_fee: Cents,
        idempotency_key: &str,
    ) -> Result<IntentInfo, ProcessorError> {
        let mut state = self.state();
        state.calls.push(ProcessorCall::Capture {
            intent_id: intent_id.to_string(),
            amount,
            platform_fee,
            idempotency_key: idempotency_key.to_string(),
        });
        let fault = state.capture_fault.take();
        with_fault(&mut state, fault, idempotency_key, |state| {
            let intent = state
                .intents
                .get_mut(intent_id)
                .ok_or_else(|| ProcessorError::Rejected(format!("No such payment_intent: {intent_id}")))?;
            if intent.status != IntentStatus::RequiresCapture {
                return Err(ProcessorError::Rejected(format!("The payment intent is {}", intent.status)));
            }
            if amount > intent.amount {
                return Err(ProcessorError::Rejected("amount_to_capture exceeds the authorized amount".into()));
            }
            intent.status = IntentStatus::Succeeded;
            intent.amount_received = amount;
            Ok(intent.clone())
        })
    }

    async fn cancel(&self, intent_id: &str, idempotency_key: &str) -> Result<IntentInfo, ProcessorError> {
        let mut state = self.state();
        state
            .calls
            .push(ProcessorCall::Cancel { intent_id: intent_id.to_string(), idempotency_key: idempotency_key.to_string() });
        let fault = state.cancel_fault.take();
        with_fault(&mut state, fault, idempotency_key, |state| {
            let intent = state
                .intents
                .get_mut(intent_id)
                .ok_or_else(|| ProcessorError::Rejected(format!("No such payment_intent: {intent_id}")))?;
            if matches!(intent.status, IntentStatus::Canceled | IntentStatus::Succeeded) {
                return Err(ProcessorError::Rejected(format!("The payment intent is {}", intent.status)));
            }
            intent.status = IntentStatus::Canceled;
            Ok(intent.clone())
        })
    }

    async fn retrieve(&self, intent_id: &str) -> Result<IntentInfo, ProcessorError> {
        let mut state = self.state();
        state.calls.push(ProcessorCall::Retrieve { intent_id: intent_id.to_string() });
        state
            .intents
            .get(intent_id)
            .cloned()
            .ok_or_else(|| ProcessorError::Rejected(format!("No such payment_intent: {intent_id}")))
    }

    async fn find_hold(&self, ledger_entry_id: i64) -> Result<Option<IntentInfo>, ProcessorError> {
        let mut state = self.state();
        state.calls.push(ProcessorCall::FindHold { ledger_entry_id });
        let found = state.intents.values().find(|i| i.ledger_entry_id == Some(ledger_entry_id)).cloned();
        Ok(found)
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use super::*;

    fn hold(key: &str) -> HoldRequest {
        HoldRequest {
            amount: Cents::from(8000),
            platform_fee: Cents::from(200),
            currency: "usd".into(),
            payment_method: "pm_card_visa".into(),
            destination_account: "acct_1".into(),
            description: None,
            metadata: BTreeMap::new(),
            ledger_entry_id: 1,
            idempotency_key: key.into(),
        }
    }

    #[tokio::test]
    async fn idempotent_holds() {
        let processor = MockProcessor::new();
        let a = processor.create_hold(hold("k1")).await.unwrap();
        let b = processor.create_hold(hold("k1")).await.unwrap();
        assert_eq!(a.id, b.id);
        let c = processor.create_hold(hold("k2")).await.unwrap();
        assert_ne!(a.id, c.id);
        assert_eq!(c.status, IntentStatus::RequiresCapture);
    }

    #[tokio::test]
    async fn lost_capture_still_lands() {
        let processor = MockProcessor::new();
        let intent = processor.create_hold(hold("k1")).await.unwrap();
        processor.fail_next_capture(Fault::LostResponse);
        let err = processor.capture(&intent.id, Cents::from(7000), Cents::from(175), "c1").await;
        assert!(matches!(err, Err(ProcessorError::Unavailable(_))));
        let intent = processor.retrieve(&intent.id).await.unwrap();
        assert_eq!(intent.status, IntentStatus::Succeeded);
        assert_eq!(intent.amount_received, Cents::from(7000));
        // Replaying the key returns the original outcome
        let replay = processor.capture(&intent.id, Cents::from(7000), Cents::from(175), "c1").await.unwrap();
        assert_eq!(replay.status, IntentStatus::Succeeded);
    }

    #[tokio::test]
    async fn lost_holds_can_be_found_by_ledger_entry() {
        let processor = MockProcessor::new();
        processor.fail_next_hold(Fault::LostResponse);
        let err = processor.create_hold(hold("k1")).await;
        assert!(matches!(err, Err(ProcessorError::Unavailable(_))));
        let found = processor.find_hold(1).await.unwrap().expect("the hold was placed");
        assert_eq!(found.status, IntentStatus::RequiresCapture);
        assert_eq!(found.ledger_entry_id, Some(1));
        assert!(processor.find_hold(2).await.unwrap().is_none());
    }
}
