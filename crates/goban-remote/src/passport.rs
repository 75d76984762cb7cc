//! Web QR login against the passport service.

use crate::client::decode;
use crate::wire::{Envelope, LoginInfo, LoginUrl};
use async_trait::async_trait;
use goban_core::{
    config::RemoteConfig,
    error::RemoteError,
    model::{LoginCode, LoginPoll},
    traits::LoginPeer,
};
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use tracing::{debug, info};

/// Poll status: nobody scanned yet.
const POLL_AWAITING_SCAN: i64 = -4;
/// Poll status: scanned, waiting for confirmation on the phone.
const POLL_SCANNED: i64 = -5;
/// Poll status: code expired.
const POLL_EXPIRED: i64 = -2;

/// Cookies that must all be present for a usable credential.
const REQUIRED_COOKIES: [&str; 3] = ["bili_jct", "SESSDATA", "DedeUserID"];
const OPTIONAL_COOKIES: [&str; 2] = ["DedeUserID__ckMd5", "sid"];

/// Issues and polls login codes. Polls are single-shot: the caller polls again.
pub struct PassportClient {
    http: reqwest::Client,
    base: String,
}

impl PassportClient {
    pub fn new(remote: &RemoteConfig) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            REFERER,
            HeaderValue::from_static("https://passport.bilibili.com/login"),
        );
        let http = reqwest::Client::builder()
            .timeout(remote.timeout())
            .user_agent(remote.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base: remote.passport_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl LoginPeer for PassportClient {
    async fn issue_code(&self) -> Result<LoginCode, RemoteError> {
        let path = "/qrcode/getLoginUrl";
        let resp = self
            .http
            .get(format!("{}{path}", self.base))
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("GET {path} failed: {e}")))?;
        let env: Envelope<LoginUrl> = decode(path, resp).await?;
        if env.code != 0 {
            return Err(RemoteError::PeerRejected {
                code: env.code,
                message: env.message,
            });
        }
        let data = env.data.unwrap_or_default();
        if data.oauth_key.is_empty() || data.url.is_empty() {
            return Err(RemoteError::Transport(
                "login code response without key or url".to_string(),
            ));
        }
        info!("issued login code");
        Ok(LoginCode {
            auth_code: data.oauth_key,
            url: data.url,
        })
    }

    async fn poll_code(&self, auth_code: &str) -> Result<LoginPoll, RemoteError> {
        let path = "/qrcode/getLoginInfo";
        let resp = self
            .http
            .post(format!("{}{path}", self.base))
            .form(&[
                ("oauthKey", auth_code),
                ("gourl", "https://www.bilibili.com/"),
            ])
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("POST {path} failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Transport(format!("{path}: HTTP {status}")));
        }
        let body: LoginInfo = resp
            .json()
            .await
            .map_err(|e| RemoteError::Transport(format!("{path}: invalid response: {e}")))?;
        let poll = interpret_poll(body);
        debug!("login poll: {poll:?}");
        Ok(poll)
    }
}

fn interpret_poll(body: LoginInfo) -> LoginPoll {
    if body.status {
        let redirect_url = body
            .data
            .get("url")
            .and_then(|u| u.as_str())
            .unwrap_or_default()
            .to_string();
        return LoginPoll::Confirmed { redirect_url };
    }
    let code = body
        .data
        .as_i64()
        .or_else(|| body.data.get("code").and_then(|c| c.as_i64()));
    match code {
        Some(POLL_AWAITING_SCAN) => LoginPoll::AwaitingScan,
        Some(POLL_SCANNED) => LoginPoll::Scanned,
        Some(POLL_EXPIRED) => LoginPoll::Expired,
        Some(code) => LoginPoll::Unknown { code },
        None => LoginPoll::Unknown { code: 0 },
    }
}

/// Build a cookie header from the confirmation redirect URL.
///
/// Values are kept exactly as they appear in the query string; `SESSDATA`
/// is already cookie-encoded there. Returns `None` when a required cookie
/// is missing.
pub fn extract_credential(redirect_url: &str) -> Option<String> {
    let (_, query) = redirect_url.split_once('?')?;
    let params: Vec<(&str, &str)> = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .collect();
    let lookup = |key: &str| {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .filter(|v| !v.is_empty())
    };

    let mut parts = Vec::new();
    for key in REQUIRED_COOKIES {
        parts.push(format!("{key}={}", lookup(key)?));
    }
    for key in OPTIONAL_COOKIES {
        if let Some(value) = lookup(key) {
            parts.push(format!("{key}={value}"));
        }
    }
    Some(parts.join("; "))
}
