//! HTTP surface.
//!
//! Handlers are thin: they pull the actor and the request body out of the
//! request, call into [`crate::core`], and shape the JSON response. All JSON is
//! camelCase and every failure renders as `{ "error": string }`.

pub mod auth;
pub mod deliverables;
pub mod error;
pub mod members;
pub mod packages;
pub mod sprints;
pub mod tasks;

use crate::{
    core::pricing::PricingPolicy,
    services::{links::LinkFetcher, mailer::Mailer, openai::SummaryComposer},
};
use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared handles available to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub policy: Arc<PricingPolicy>,
    pub mailer: Arc<dyn Mailer>,
    pub composer: Arc<dyn SummaryComposer>,
    pub links: LinkFetcher,
    /// Public URL of the web app, for links in emails
    pub app_base_url: Arc<str>,
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(sprints::router())
        .merge(packages::router())
        .merge(members::router())
        .merge(tasks::router())
        .merge(deliverables::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Helpers for driving the router in tests.

    #![allow(clippy::unwrap_used)]
    use super::{AppState, router};
    use crate::core::pricing::PricingPolicy;
    use crate::services::links::LinkFetcher;
    use crate::test_utils::{RecordingMailer, StubComposer};
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use sea_orm::DatabaseConnection;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    pub fn test_state(
        db: &DatabaseConnection,
        mailer: Arc<RecordingMailer>,
        composer: Arc<StubComposer>,
    ) -> AppState {
        AppState {
            db: db.clone(),
            policy: Arc::new(PricingPolicy::default()),
            mailer,
            composer,
            links: LinkFetcher::new().unwrap(),
            app_base_url: Arc::from("http://localhost:3000"),
        }
    }

    /// Sends one request through a fresh router and returns the status and JSON body.
    pub async fn send(
        state: &AppState,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}
