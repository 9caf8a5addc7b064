//! Resolution of the identity recorded on audit entries.

use crate::record::SYSTEM_ACTOR;
use axum::{extract::Request, middleware::Next, response::Response};
use axum_helpers::ACTOR_HEADER;
use std::future::Future;

tokio::task_local! {
    static CURRENT_ACTOR: String;
}

/// Supplies the principal behind the current write, if any.
pub trait ActorProvider: Send + Sync {
    fn current_actor(&self) -> Option<String>;

    fn actor_or_system(&self) -> String {
        self.current_actor()
            .filter(|actor| !actor.trim().is_empty())
            .unwrap_or_else(|| SYSTEM_ACTOR.to_string())
    }
}

/// Reads the actor bound with [`scope_actor`] on the running task.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskLocalActor;

impl ActorProvider for TaskLocalActor {
    fn current_actor(&self) -> Option<String> {
        CURRENT_ACTOR.try_with(Clone::clone).ok()
    }
}

/// Fixed identity, for jobs and tests.
#[derive(Debug, Clone)]
pub struct StaticActor(pub String);

impl ActorProvider for StaticActor {
    fn current_actor(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Runs `fut` with `actor` as the current principal.
pub async fn scope_actor<F>(actor: impl Into<String>, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_ACTOR.scope(actor.into(), fut).await
}

/// Binds the `x-actor` header to the request task. Requests without the
/// header run unscoped and are audited as `SYSTEM`.
pub async fn actor_middleware(request: Request, next: Next) -> Response {
    let actor = request
        .headers()
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    match actor {
        Some(actor) => scope_actor(actor, next.run(request)).await,
        None => next.run(request).await,
    }
}
