use axum::{Form, Json, extract::State, http::HeaderMap};

use crate::{
    AppState,
    api::models::auth::{LoginInfo, LoginRequest, LoginResponse, MeResponse},
    auth::middleware::Identity,
    errors::Error,
};

/// Log in with a username and password form.
///
/// Sets the session cookie (when the backend issues a token) and the permissions cookie.
#[tracing::instrument(skip_all, fields(username = %request.username))]
pub async fn login(State(state): State<AppState>, Form(request): Form<LoginRequest>) -> Result<LoginResponse, Error> {
    let mut cookies = HeaderMap::new();
    let session = state
        .authenticator
        .login(&request.username, &request.password, &mut cookies)
        .await?;

    Ok(LoginResponse {
        info: LoginInfo {
            username: request.username,
            permissions: session.permissions.unwrap_or_default(),
        },
        cookies,
    })
}

/// Identity of the caller, as established by the authentication middleware
#[tracing::instrument(skip_all)]
pub async fn me(identity: Identity) -> Json<MeResponse> {
    Json(MeResponse {
        username: identity.username,
        token_present: !identity.token.is_empty(),
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::auth::{LoginInfo, MeResponse},
        auth::headers::{AuthenticationOpts, basic_authorization},
        config::{BackendConfig, HttpConfig},
        test_utils::{basic_config, config_with_backend, create_test_server},
    };
    use axum::http::{StatusCode, header};

    #[test_log::test(tokio::test)]
    async fn test_login_success_sets_cookies() {
        let server = create_test_server(basic_config(&[("alice", "secret")], "operator")).await;

        let response = server
            .post("/login")
            .form(&[("username", "alice"), ("password", "secret")])
            .await;

        response.assert_status_ok();
        let info: LoginInfo = response.json();
        assert_eq!(info.username, "alice");
        assert_eq!(info.permissions, vec!["capture.write", "topology.read"]);

        let cookies: Vec<String> = response
            .iter_headers_by_name(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("authtok=") && cookies[0].ends_with("; Path=/"));
        assert!(cookies[1].starts_with("permissions="));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let server = create_test_server(basic_config(&[("alice", "secret")], "operator")).await;

        let response = server
            .post("/login")
            .form(&[("username", "alice"), ("password", "wrong")])
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert!(response.maybe_header(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_login_missing_field_rejected() {
        let server = create_test_server(basic_config(&[("alice", "secret")], "operator")).await;

        let response = server.post("/login").form(&[("username", "alice")]).await;

        assert!(response.status_code().is_client_error());
    }

    #[tokio::test]
    async fn test_session_cookie_from_login_opens_api() {
        let server = create_test_server(basic_config(&[("alice", "secret")], "operator")).await;

        let login = server
            .post("/login")
            .form(&[("username", "alice"), ("password", "secret")])
            .await;
        let set_cookie = login.header(header::SET_COOKIE).to_str().unwrap().to_string();
        let token = set_cookie
            .strip_prefix("authtok=")
            .and_then(|rest| rest.strip_suffix("; Path=/"))
            .unwrap();

        // Reuse the token the way a remote client would
        let headers = AuthenticationOpts::with_token(token)
            .headers(&HttpConfig::default())
            .unwrap();
        let cookie = headers.get(header::COOKIE).unwrap().to_str().unwrap().to_string();

        let response = server.get("/api/me").add_header(header::COOKIE, cookie).await;

        response.assert_status_ok();
        response.assert_json(&MeResponse {
            username: None,
            token_present: true,
        });
    }

    #[tokio::test]
    async fn test_me_with_basic_credentials() {
        let server = create_test_server(basic_config(&[("alice", "secret")], "operator")).await;

        let response = server
            .get("/api/me")
            .add_header(header::AUTHORIZATION, basic_authorization("alice", "secret"))
            .await;

        response.assert_status_ok();
        response.assert_json(&MeResponse {
            username: Some("alice".to_string()),
            token_present: true,
        });
    }

    #[tokio::test]
    async fn test_me_requires_authentication() {
        let server = create_test_server(basic_config(&[("alice", "secret")], "operator")).await;

        server.get("/api/me").await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_noauth_server() {
        let config = config_with_backend(
            "default",
            BackendConfig {
                kind: Some("noauth".to_string()),
                ..Default::default()
            },
        );
        let server = create_test_server(config).await;

        let response = server.get("/api/me").await;
        response.assert_status_ok();
        response.assert_json(&MeResponse {
            username: Some("admin".to_string()),
            token_present: false,
        });

        // Any credentials log in; no token means only the permissions cookie
        let login = server
            .post("/login")
            .form(&[("username", "anyone"), ("password", "")])
            .await;
        login.assert_status_ok();
        let cookies: Vec<_> = login.iter_headers_by_name(header::SET_COOKIE).collect();
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].to_str().unwrap().starts_with("permissions="));
    }

    #[tokio::test]
    async fn test_healthz_is_open() {
        let server = create_test_server(basic_config(&[("alice", "secret")], "operator")).await;

        server.get("/healthz").await.assert_status_ok();
    }
}
