//! Bearer token → `Authentication` in request extensions.
//!
//! - `Authorization: Bearer <jwt>` を検証し、live user record から Identity を組み立てる
//! - 失敗しても request は止めない (Anonymous として次へ流す)
//! - 401 にするかどうかは route 側の extractor (`CurrentIdentity`) が決める

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::services::auth::AuthService;

/// Apply authentication to every route of `router`.
///
/// ```ignore
/// let v1 = api::v1::routes();
/// let v1 = middleware::auth::access::apply(v1, state.auth.clone());
/// app = app.nest("/api/v1", v1);
/// ```
pub fn apply<S>(router: Router<S>, auth: Arc<AuthService>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(auth, access_middleware))
}

async fn access_middleware(
    State(auth): State<Arc<AuthService>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let authentication = auth.authenticate(req.headers()).await;
    if let Some(identity) = authentication.identity() {
        tracing::debug!(user_id = identity.id, path = %req.uri().path(), "request authenticated");
    }

    // middleware → extractor への受け渡し (request 単位、共有状態なし)
    req.extensions_mut().insert(authentication);

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        Extension,
        body::to_bytes,
        http::{StatusCode, header},
        routing::get,
    };
    use chrono::Utc;
    use tower::ServiceExt;

    use super::*;
    use crate::api::v1::extractors::CurrentIdentity;
    use crate::services::auth::Authentication;
    use crate::services::auth::identity::{Role, RoleMapping};
    use crate::services::auth::resolver::IdentityResolver;
    use crate::services::auth::token_codec::{SigningSecret, TokenCodec};
    use crate::test_support::{MemoryUserStore, TEST_SECRET, user_record};

    fn auth_service(store: Arc<MemoryUserStore>) -> Arc<AuthService> {
        let codec = TokenCodec::new(
            SigningSecret::parse(TEST_SECRET).unwrap(),
            Duration::from_secs(600),
        )
        .unwrap();
        let resolver = IdentityResolver::new(store, RoleMapping::default(), Duration::from_secs(1));
        Arc::new(AuthService::new(codec, resolver))
    }

    async fn whoami(Extension(authentication): Extension<Authentication>) -> String {
        authentication
            .identity()
            .map(|i| i.username.clone())
            .unwrap_or_else(|| "anonymous".to_string())
    }

    async fn protected(CurrentIdentity(identity): CurrentIdentity) -> String {
        identity.id.to_string()
    }

    fn app(auth: Arc<AuthService>) -> Router {
        let router = Router::new()
            .route("/whoami", get(whoami))
            .route("/protected", get(protected));
        apply(router, auth)
    }

    async fn call(app: Router, uri: &str, authorization: Option<&str>) -> (StatusCode, String) {
        let mut req = Request::builder().uri(uri);
        if let Some(value) = authorization {
            req = req.header(header::AUTHORIZATION, value);
        }
        let res = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = res.status();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn anonymous_requests_still_reach_the_handler() {
        let store = Arc::new(MemoryUserStore::new());
        let app = app(auth_service(store.clone()));

        let (status, body) = call(app.clone(), "/whoami", None).await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "anonymous"));

        let (status, body) = call(app, "/whoami", Some("Basic xyz")).await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "anonymous"));

        assert_eq!(store.lookups(), 0);
    }

    #[tokio::test]
    async fn protected_route_rejects_anonymous_with_generic_401() {
        let store = Arc::new(MemoryUserStore::new());
        store.insert(user_record(7, "alice", &["USER"]));
        let app = app(auth_service(store));

        for authorization in [None, Some("Bearer garbage"), Some("Basic xyz")] {
            let (status, body) = call(app.clone(), "/protected", authorization).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert!(body.contains("not authenticated"), "{body}");
            assert!(!body.to_lowercase().contains("signature"));
        }
    }

    #[tokio::test]
    async fn valid_token_reaches_protected_route() {
        let store = Arc::new(MemoryUserStore::new());
        store.insert(user_record(7, "alice", &["USER"]));
        let auth = auth_service(store);
        let token = auth.codec().issue("alice", &[Role::User], Utc::now()).unwrap();

        let (status, body) = call(app(auth), "/protected", Some(&format!("Bearer {token}"))).await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "7"));
    }

    #[tokio::test]
    async fn concurrent_requests_keep_their_own_identity() {
        let store = Arc::new(MemoryUserStore::new());
        store.insert(user_record(1, "alice", &["USER"]));
        store.insert(user_record(2, "bob", &["USER"]));
        let auth = auth_service(store);
        let app = app(auth.clone());

        let mut handles = Vec::new();
        for i in 0..32 {
            let user = match i % 3 {
                0 => Some("alice"),
                1 => Some("bob"),
                _ => None,
            };
            let header = user.map(|u| {
                let token = auth.codec().issue(u, &[Role::User], Utc::now()).unwrap();
                format!("Bearer {token}")
            });
            let app = app.clone();
            handles.push(tokio::spawn(async move {
                let (_, body) = call(app, "/whoami", header.as_deref()).await;
                (user.unwrap_or("anonymous"), body)
            }));
        }

        for handle in handles {
            let (expected, body) = handle.await.unwrap();
            assert_eq!(body, expected);
        }
    }

    #[tokio::test]
    async fn slow_lookup_fails_closed() {
        let store = Arc::new(MemoryUserStore::new());
        store.insert(user_record(7, "alice", &["USER"]));
        store.set_delay(Duration::from_secs(5));

        let codec = TokenCodec::new(
            SigningSecret::parse(TEST_SECRET).unwrap(),
            Duration::from_secs(600),
        )
        .unwrap();
        let resolver =
            IdentityResolver::new(store, RoleMapping::default(), Duration::from_millis(20));
        let auth = Arc::new(AuthService::new(codec, resolver));
        let token = auth.codec().issue("alice", &[Role::User], Utc::now()).unwrap();

        let (status, _) = call(app(auth), "/protected", Some(&format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
