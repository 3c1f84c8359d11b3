//! Status waiter
//!
//! Polls a fetch function until the observed state reaches a target state.
//! Transient failures are retried inside a single poll; with
//! `error_on_not_found` off, a vanished resource is reported as `DELETED`.

use std::future::Future;

use cumulus_core::context::OperationContext;
use tokio::time::Instant;

use crate::client::ApiError;
use crate::config::WaitSettings;
use crate::error::{ScpError, ScpResult};

pub const RUNNING: &str = "RUNNING";
pub const STOPPED: &str = "STOPPED";
/// Synthetic terminal state of a resource the remote no longer knows
pub const DELETED: &str = "DELETED";
pub const TERMINATED: &str = "TERMINATED";

/// Reported states of a resource that is gone but still listed
pub fn is_gone(state: &str) -> bool {
    state == DELETED || state == TERMINATED
}

/// States a resource passes through while the remote works on it
pub const TRANSITIONAL: &[&str] = &[
    "CREATING",
    "EDITING",
    "STARTING",
    "STOPPING",
    "RESTARTING",
    "TERMINATING",
    "DELETING",
    "ATTACHING",
    "DETACHING",
];

/// One observation of a remote resource
#[derive(Debug, Clone)]
pub struct Observation<T> {
    pub payload: T,
    pub state: String,
}

impl<T> Observation<T> {
    pub fn new(payload: T, state: impl Into<String>) -> Self {
        Self {
            payload,
            state: state.into(),
        }
    }
}

/// What to wait for
#[derive(Debug, Clone)]
pub struct WaitFor<'a> {
    /// Human readable subject, e.g. `mariadb cluster cl-1`
    pub what: String,
    pub pending: Vec<&'a str>,
    pub target: Vec<&'a str>,
    pub error_on_not_found: bool,
    pub deadline: Instant,
}

impl<'a> WaitFor<'a> {
    /// Wait until `target` while the resource is in a transitional state
    pub fn state(what: impl Into<String>, target: &'a str, deadline: Instant) -> Self {
        Self {
            what: what.into(),
            pending: TRANSITIONAL.to_vec(),
            target: vec![target],
            error_on_not_found: true,
            deadline,
        }
    }

    pub fn running(what: impl Into<String>, deadline: Instant) -> Self {
        Self::state(what, RUNNING, deadline)
    }

    /// Wait until the remote stops reporting the resource
    pub fn deleted(what: impl Into<String>, deadline: Instant) -> Self {
        let mut pending = TRANSITIONAL.to_vec();
        pending.extend([RUNNING, STOPPED]);
        Self {
            what: what.into(),
            pending,
            target: vec![DELETED, TERMINATED],
            error_on_not_found: false,
            deadline,
        }
    }

    pub fn with_pending(mut self, state: &'a str) -> Self {
        self.pending.push(state);
        self
    }
}

/// Poll loop driven by `WaitSettings`
#[derive(Debug, Clone, Default)]
pub struct Waiter {
    settings: WaitSettings,
}

impl Waiter {
    pub fn new(settings: WaitSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &WaitSettings {
        &self.settings
    }

    /// Poll `fetch` until the state is in `spec.target`
    ///
    /// Returns the last payload, or `None` when the target was reached through
    /// the synthetic `DELETED` state.
    pub async fn wait<T, F, Fut>(
        &self,
        ctx: &OperationContext,
        spec: &WaitFor<'_>,
        mut fetch: F,
    ) -> ScpResult<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observation<T>, ApiError>>,
    {
        let target = spec.target.join(", ");
        let mut last_state = String::from("unknown");

        loop {
            ctx.check()?;

            let (payload, state) = match self.fetch_with_retry(ctx, &mut fetch).await {
                Ok(observation) => (Some(observation.payload), observation.state),
                Err(e) if e.is_not_found() && !spec.error_on_not_found => {
                    (None, DELETED.to_string())
                }
                Err(e) => return Err(e.into()),
            };
            log::debug!("{} is {}", spec.what, state);

            if spec.target.contains(&state.as_str()) {
                return Ok(payload);
            }
            if !spec.pending.contains(&state.as_str()) {
                return Err(ScpError::UnexpectedState {
                    what: spec.what.clone(),
                    state,
                    target,
                });
            }
            last_state = state;

            let now = Instant::now();
            if now >= spec.deadline {
                break;
            }
            let pause = self.settings.poll_interval().min(spec.deadline - now);
            ctx.sleep(pause).await?;
        }

        Err(ScpError::Timeout {
            what: spec.what.clone(),
            target,
            last_state,
        })
    }

    async fn fetch_with_retry<T, F, Fut>(
        &self,
        ctx: &OperationContext,
        fetch: &mut F,
    ) -> Result<Observation<T>, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Observation<T>, ApiError>>,
    {
        let mut attempt = 0;
        loop {
            match fetch().await {
                Err(e) if e.is_transient() && attempt < self.settings.transient_retries => {
                    attempt += 1;
                    log::warn!(
                        "transient failure ({}), retry {}/{}",
                        e,
                        attempt,
                        self.settings.transient_retries
                    );
                    ctx.sleep(self.settings.retry_pause())
                        .await
                        .map_err(RetryError::Cancelled)?;
                }
                other => return other.map_err(RetryError::Api),
            }
        }
    }
}

enum RetryError {
    Api(ApiError),
    Cancelled(cumulus_core::context::Cancelled),
}

impl RetryError {
    fn is_not_found(&self) -> bool {
        matches!(self, RetryError::Api(e) if e.is_not_found())
    }
}

impl From<RetryError> for ScpError {
    fn from(e: RetryError) -> Self {
        match e {
            RetryError::Api(e) => ScpError::Api(e),
            RetryError::Cancelled(c) => ScpError::Cancelled(c),
        }
    }
}

/// State of a parent with sub-entities
///
/// A parent that is itself transitioning reports its own state. Otherwise it
/// is RUNNING when every sub-entity is RUNNING, else the first sub-entity
/// state that is not. Without sub-entities the parent's own state is used.
pub fn aggregate_state<'a>(own: &'a str, subs: impl IntoIterator<Item = &'a str>) -> &'a str {
    if own != RUNNING {
        return own;
    }
    subs.into_iter().find(|s| *s != RUNNING).unwrap_or(own)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Method;
    use std::sync::Mutex;
    use std::time::Duration;

    fn status(code: u16) -> ApiError {
        ApiError::from_status(Method::Get, "/detail", code, "")
    }

    fn scripted(
        script: Vec<Result<&'static str, u16>>,
    ) -> (Mutex<std::vec::IntoIter<Result<&'static str, u16>>>, Mutex<usize>) {
        (Mutex::new(script.into_iter()), Mutex::new(0))
    }

    async fn run(
        waiter: &Waiter,
        ctx: &OperationContext,
        spec: &WaitFor<'_>,
        script: Vec<Result<&'static str, u16>>,
    ) -> (ScpResult<Option<String>>, usize) {
        let (steps, calls) = scripted(script);
        let steps = &steps;
        let calls = &calls;
        let result = waiter
            .wait(ctx, spec, move || async move {
                *calls.lock().unwrap() += 1;
                match steps.lock().unwrap().next() {
                    Some(Ok(state)) => Ok(Observation::new(state.to_string(), state)),
                    Some(Err(code)) => Err(status(code)),
                    None => Ok(Observation::new("RUNNING".to_string(), "RUNNING")),
                }
            })
            .await;
        let count = *calls.lock().unwrap();
        (result, count)
    }

    fn far() -> Instant {
        Instant::now() + Duration::from_secs(3600)
    }

    #[tokio::test(start_paused = true)]
    async fn reaches_target_after_pending() {
        let waiter = Waiter::default();
        let ctx = OperationContext::new();
        let spec = WaitFor::running("cluster cl-1", far());
        let (result, calls) = run(
            &waiter,
            &ctx,
            &spec,
            vec![Ok("CREATING"), Ok("EDITING"), Ok("RUNNING")],
        )
        .await;
        assert_eq!(result.unwrap().as_deref(), Some("RUNNING"));
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let waiter = Waiter::default();
        let ctx = OperationContext::new();
        let spec = WaitFor::running("cluster cl-1", far());
        let mut script: Vec<Result<&'static str, u16>> = vec![Err(503); 10];
        script.push(Ok("RUNNING"));
        let (result, calls) = run(&waiter, &ctx, &spec, script).await;
        assert!(result.is_ok());
        assert_eq!(calls, 11);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_transient_failure_surfaces() {
        let waiter = Waiter::default();
        let ctx = OperationContext::new();
        let spec = WaitFor::running("cluster cl-1", far());
        let (result, _) = run(&waiter, &ctx, &spec, vec![Err(503); 11]).await;
        match result {
            Err(ScpError::Api(e)) => assert_eq!(e.status(), Some(503)),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_deleted_when_allowed() {
        let waiter = Waiter::default();
        let ctx = OperationContext::new();
        let spec = WaitFor::deleted("cluster cl-1", far());
        let (result, _) = run(
            &waiter,
            &ctx,
            &spec,
            vec![Ok("TERMINATING"), Err(404)],
        )
        .await;
        assert_eq!(result.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_an_error_by_default() {
        let waiter = Waiter::default();
        let ctx = OperationContext::new();
        let spec = WaitFor::running("cluster cl-1", far());
        let (result, _) = run(&waiter, &ctx, &spec, vec![Err(404)]).await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_state_fails() {
        let waiter = Waiter::default();
        let ctx = OperationContext::new();
        let spec = WaitFor::running("cluster cl-1", far());
        let (result, _) = run(&waiter, &ctx, &spec, vec![Ok("ERROR")]).await;
        match result {
            Err(ScpError::UnexpectedState { state, .. }) => assert_eq!(state, "ERROR"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_reports_last_state() {
        let waiter = Waiter::default();
        let ctx = OperationContext::new();
        let spec = WaitFor::running("cluster cl-1", Instant::now() + Duration::from_secs(25));
        let (result, calls) = run(&waiter, &ctx, &spec, vec![Ok("EDITING"); 100]).await;
        match result {
            Err(ScpError::Timeout { last_state, .. }) => assert_eq!(last_state, "EDITING"),
            other => panic!("unexpected: {other:?}"),
        }
        // polls at 0s, 10s, 20s and 25s
        assert_eq!(calls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_wait() {
        let waiter = Waiter::default();
        let ctx = OperationContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(15)).await;
            canceller.cancel();
        });
        let spec = WaitFor::running("cluster cl-1", far());
        let (result, calls) = run(&waiter, &ctx, &spec, vec![Ok("EDITING"); 100]).await;
        assert!(matches!(result, Err(ScpError::Cancelled(_))));
        assert_eq!(calls, 2);
    }

    #[test]
    fn aggregate_rules() {
        assert_eq!(aggregate_state("EDITING", []), "EDITING");
        assert_eq!(aggregate_state("RUNNING", []), "RUNNING");
        assert_eq!(aggregate_state("RUNNING", ["RUNNING", "RUNNING"]), "RUNNING");
        assert_eq!(aggregate_state("EDITING", ["RUNNING", "RUNNING"]), "EDITING");
        assert_eq!(aggregate_state("STOPPED", ["STOPPED"]), "STOPPED");
        assert_eq!(
            aggregate_state("RUNNING", ["RUNNING", "STARTING", "STOPPED"]),
            "STARTING"
        );
    }
}
