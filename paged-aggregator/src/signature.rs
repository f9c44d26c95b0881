use crate::types::{AggregatorError, Result};
use tracing::{debug, info};

/// Where a wallet-signature login currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureState {
    Idle,
    AwaitingSignature { nonce: String },
    Verifying { nonce: String, signature: String },
    Success { address: String },
    Error { reason: String },
}

impl SignatureState {
    pub fn name(&self) -> &'static str {
        match self {
            SignatureState::Idle => "idle",
            SignatureState::AwaitingSignature { .. } => "awaiting-signature",
            SignatureState::Verifying { .. } => "verifying",
            SignatureState::Success { .. } => "success",
            SignatureState::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SignatureState::Success { .. } | SignatureState::Error { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureEvent {
    Start { nonce: String },
    Signed { signature: String },
    Rejected { reason: String },
    Verified { address: String },
    VerificationFailed { reason: String },
    Reset,
}

impl SignatureEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SignatureEvent::Start { .. } => "start",
            SignatureEvent::Signed { .. } => "signed",
            SignatureEvent::Rejected { .. } => "rejected",
            SignatureEvent::Verified { .. } => "verified",
            SignatureEvent::VerificationFailed { .. } => "verification-failed",
            SignatureEvent::Reset => "reset",
        }
    }
}

/// The next state for `event`, or an error if `state` does not accept it.
pub fn transition(state: &SignatureState, event: SignatureEvent) -> Result<SignatureState> {
    use SignatureEvent as E;
    use SignatureState as S;

    match (state, event) {
        (_, E::Reset) => Ok(S::Idle),
        (S::Idle | S::Error { .. }, E::Start { nonce }) => Ok(S::AwaitingSignature { nonce }),
        (S::AwaitingSignature { nonce }, E::Signed { signature }) => Ok(S::Verifying {
            nonce: nonce.clone(),
            signature,
        }),
        (S::AwaitingSignature { .. }, E::Rejected { reason }) => Ok(S::Error { reason }),
        (S::Verifying { .. }, E::Verified { address }) => Ok(S::Success { address }),
        (S::Verifying { .. }, E::VerificationFailed { reason }) => Ok(S::Error { reason }),
        (state, event) => Err(AggregatorError::InvalidTransition {
            from: state.name().to_string(),
            event: event.name().to_string(),
        }),
    }
}

/// Drives one signature flow. A rejected event leaves the state untouched.
#[derive(Debug, Clone)]
pub struct SignatureFlow {
    state: SignatureState,
}

impl SignatureFlow {
    pub fn new() -> Self {
        Self {
            state: SignatureState::Idle,
        }
    }

    pub fn state(&self) -> &SignatureState {
        &self.state
    }

    pub fn handle(&mut self, event: SignatureEvent) -> Result<&SignatureState> {
        let event_name = event.name();
        let next = transition(&self.state, event)?;
        debug!("Signature flow: {} --{}--> {}", self.state.name(), event_name, next.name());
        if let SignatureState::Success { address } = &next {
            info!("Signature verified for {}", address);
        }
        self.state = next;
        Ok(&self.state)
    }
}

impl Default for SignatureFlow {
    fn default() -> Self {
        Self::new()
    }
}
