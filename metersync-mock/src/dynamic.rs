use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use metersync_core::connector::{Authenticator, MeterConnector, PeriodRequest, PeriodValuesProvider};
use metersync_core::{AccessToken, AuthError, Credentials, FetchFailure, PeriodValues};

/// Instruction for how a method should behave on its next call.
#[derive(Clone, Debug)]
pub enum MockBehavior<T, E> {
    /// Return the provided value immediately.
    Return(T),
    /// Fail immediately with the provided error.
    Fail(E),
    /// Hang indefinitely (simulate a timeout).
    Hang,
}

impl<T, E> MockBehavior<T, E> {
    async fn resolve(self) -> Result<T, E> {
        match self {
            Self::Return(v) => Ok(v),
            Self::Fail(e) => Err(e),
            Self::Hang => std::future::pending().await,
        }
    }
}

type FetchBehavior = MockBehavior<PeriodValues, FetchFailure>;
type AuthBehavior = MockBehavior<AccessToken, AuthError>;

#[derive(Default)]
struct InternalState {
    fetch_script: VecDeque<FetchBehavior>,
    fetch_default: Option<FetchBehavior>,
    auth_script: VecDeque<AuthBehavior>,
    auth_default: Option<AuthBehavior>,
    fetch_log: Vec<(AccessToken, PeriodRequest)>,
    auth_log: Vec<Credentials>,
    logout_log: Vec<AccessToken>,
    issued: usize,
}

/// Controller handle used by tests to drive the dynamic mock from the outside.
///
/// Scripted behaviors are consumed one per call in order; once a script runs
/// dry the default behavior applies. Without a default, `period_values`
/// answers `"OK"` with no records and `authenticate` issues `token-1`,
/// `token-2`, and so on.
#[derive(Clone)]
pub struct DynamicMockController {
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockController {
    /// Queue a one-shot behavior for the next unscripted `period_values` call.
    pub async fn push_period_values(&self, behavior: MockBehavior<PeriodValues, FetchFailure>) {
        self.state.lock().await.fetch_script.push_back(behavior);
    }

    /// Set the behavior used once the `period_values` script is exhausted.
    pub async fn set_period_values(&self, behavior: MockBehavior<PeriodValues, FetchFailure>) {
        self.state.lock().await.fetch_default = Some(behavior);
    }

    /// Queue a one-shot behavior for the next unscripted `authenticate` call.
    pub async fn push_authenticate(&self, behavior: MockBehavior<AccessToken, AuthError>) {
        self.state.lock().await.auth_script.push_back(behavior);
    }

    /// Set the behavior used once the `authenticate` script is exhausted.
    pub async fn set_authenticate(&self, behavior: MockBehavior<AccessToken, AuthError>) {
        self.state.lock().await.auth_default = Some(behavior);
    }

    /// Tokens and requests seen by `period_values`, in call order.
    pub async fn period_requests(&self) -> Vec<(AccessToken, PeriodRequest)> {
        self.state.lock().await.fetch_log.clone()
    }

    /// Number of `authenticate` calls so far.
    pub async fn authenticate_calls(&self) -> usize {
        self.state.lock().await.auth_log.len()
    }

    /// Credentials passed to `authenticate`, in call order.
    pub async fn authenticate_log(&self) -> Vec<Credentials> {
        self.state.lock().await.auth_log.clone()
    }

    /// Tokens passed to `logout`, in call order.
    pub async fn logouts(&self) -> Vec<AccessToken> {
        self.state.lock().await.logout_log.clone()
    }

    /// Clear all configured behaviors and call logs.
    pub async fn clear_all(&self) {
        let mut guard = self.state.lock().await;
        *guard = InternalState::default();
    }
}

/// A connector that defers all behavior to an external controller.
pub struct DynamicMockConnector {
    name: &'static str,
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockConnector {
    /// Create a new dynamic mock connector and its controller.
    #[must_use]
    pub fn new_with_controller(
        name: &'static str,
    ) -> (Arc<dyn MeterConnector>, DynamicMockController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let controller = DynamicMockController {
            state: Arc::clone(&state),
        };
        let me = Arc::new(Self { name, state });
        (me as Arc<dyn MeterConnector>, controller)
    }
}

#[async_trait]
impl MeterConnector for DynamicMockConnector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn vendor(&self) -> &'static str {
        "DynamicMock"
    }

    fn as_period_values_provider(&self) -> Option<&dyn PeriodValuesProvider> {
        Some(self as &dyn PeriodValuesProvider)
    }

    fn as_authenticator(&self) -> Option<&dyn Authenticator> {
        Some(self as &dyn Authenticator)
    }
}

#[async_trait]
impl PeriodValuesProvider for DynamicMockConnector {
    async fn period_values(
        &self,
        token: &AccessToken,
        req: &PeriodRequest,
    ) -> Result<PeriodValues, FetchFailure> {
        // Acquire behavior snapshot without holding the lock across await points
        let behavior = {
            let mut guard = self.state.lock().await;
            guard.fetch_log.push((token.clone(), req.clone()));
            guard
                .fetch_script
                .pop_front()
                .or_else(|| guard.fetch_default.clone())
        };
        match behavior {
            Some(b) => b.resolve().await,
            None => Ok(PeriodValues::ok(Vec::new())),
        }
    }
}

#[async_trait]
impl Authenticator for DynamicMockConnector {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken, AuthError> {
        let behavior = {
            let mut guard = self.state.lock().await;
            guard.auth_log.push(credentials.clone());
            guard.issued += 1;
            let issued = guard.issued;
            guard
                .auth_script
                .pop_front()
                .or_else(|| guard.auth_default.clone())
                .unwrap_or_else(|| MockBehavior::Return(AccessToken::new(format!("token-{issued}"))))
        };
        behavior.resolve().await
    }

    async fn logout(&self, token: &AccessToken) -> Result<(), AuthError> {
        self.state.lock().await.logout_log.push(token.clone());
        Ok(())
    }
}
