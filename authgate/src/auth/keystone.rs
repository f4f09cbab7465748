//! External token exchange against an OpenStack Keystone identity service (v3 API).
//!
//! A login is a password-method `POST /v3/auth/tokens`. Keystone answers `201 Created` and puts
//! the issued token in the `X-Subject-Token` response header; that token becomes the session
//! token of the gateway. Nothing else from the response body is used.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use crate::{
    auth::backend::{AuthenticationBackend, DefaultRole},
    config::BackendConfig,
    errors::{Error, Result},
};

/// Header carrying the issued token in Keystone responses
pub const SUBJECT_TOKEN_HEADER: &str = "x-subject-token";

#[derive(Debug)]
pub struct KeystoneBackend {
    name: String,
    tokens_url: Url,
    domain_name: String,
    tenant_name: Option<String>,
    client: Client,
    default_role: DefaultRole,
}

impl KeystoneBackend {
    pub fn from_config(name: &str, config: &BackendConfig) -> Result<Self> {
        let Some(auth_url) = &config.auth_url else {
            tracing::error!("Keystone backend {} has no auth_url", name);
            return Err(Error::BackendConfiguration { name: name.to_string() });
        };

        // Keep any path prefix of auth_url (e.g. https://cloud/identity)
        let base = auth_url.as_str().trim_end_matches('/');
        let tokens_url = Url::parse(&format!("{base}/v3/auth/tokens")).map_err(|e| Error::Internal {
            operation: format!("build keystone tokens URL for {name}: {e}"),
        })?;

        let client = Client::builder().timeout(config.timeout).build().map_err(|e| Error::Internal {
            operation: format!("build keystone HTTP client for {name}: {e}"),
        })?;

        Ok(Self {
            name: name.to_string(),
            tokens_url,
            domain_name: config.domain_name.clone(),
            tenant_name: config.tenant_name.clone(),
            client,
            default_role: DefaultRole::default(),
        })
    }

    fn password_auth_request(&self, username: &str, password: &str) -> serde_json::Value {
        let mut request = json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": username,
                            "domain": { "name": self.domain_name },
                            "password": password,
                        }
                    }
                }
            }
        });

        if let Some(tenant) = &self.tenant_name {
            request["auth"]["scope"] = json!({
                "project": {
                    "name": tenant,
                    "domain": { "name": self.domain_name },
                }
            });
        }
        request
    }

    fn rejected(&self, message: String) -> Error {
        Error::BackendAuthentication {
            backend: self.name.clone(),
            message,
        }
    }
}

#[async_trait]
impl AuthenticationBackend for KeystoneBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_user_role(&self, _user: &str) -> String {
        self.default_role.get()
    }

    fn set_default_user_role(&self, role: &str) {
        self.default_role.set(role);
    }

    #[instrument(skip(self, password), fields(backend = %self.name, url = %self.tokens_url))]
    async fn authenticate(&self, username: &str, password: &str) -> Result<String> {
        let response = self
            .client
            .post(self.tokens_url.clone())
            .json(&self.password_auth_request(username, password))
            .send()
            .await
            .map_err(|e| self.rejected(format!("identity service unreachable: {e}")))?;

        let status = response.status();
        if status != StatusCode::CREATED && status != StatusCode::OK {
            debug!(%status, "Identity service refused credentials");
            return Err(self.rejected(format!("identity service returned {status}")));
        }

        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| self.rejected(format!("identity service returned {status} without a subject token")))?;

        Ok(token.to_string())
    }
}
