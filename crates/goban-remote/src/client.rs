//! Per-account platform API client.

use crate::retry::RetryExecutor;
use crate::wire::{AccInfo, ArcSearch, Envelope, MyInfo, ReplyPage};
use async_trait::async_trait;
use goban_core::{
    config::RemoteConfig,
    cookie::cookie_value,
    error::RemoteError,
    model::{ClientOptions, Identity, RemoteComment, RemoteItem},
    traits::{ClientFactory, Platform},
};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Credential refused: the account is logged out.
pub const CODE_NOT_LOGGED_IN: i64 = -101;
/// Comment section closed by the uploader.
pub const CODE_COMMENTS_DISABLED: i64 = 12002;
/// Request throttled or intercepted by risk control; transient.
const RATE_LIMIT_CODES: [i64; 3] = [-412, -509, -799];
/// Comment thread type for uploads.
const THREAD_TYPE_VIDEO: &str = "1";

/// Platform client bound to one cookie credential.
///
/// Proxy, timeout, and retry policy are fixed at construction and apply to
/// every call made through this instance.
pub struct BiliClient {
    http: reqwest::Client,
    cookies: String,
    api_base: String,
    retry: RetryExecutor,
}

impl BiliClient {
    pub fn new(
        cookies: &str,
        options: &ClientOptions,
        remote: &RemoteConfig,
    ) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static("https://www.bilibili.com/"));
        if !cookies.is_empty() {
            let value = HeaderValue::from_str(cookies)
                .map_err(|e| RemoteError::Transport(format!("invalid cookie header: {e}")))?;
            headers.insert(COOKIE, value);
        }

        let mut builder = reqwest::Client::builder()
            .timeout(remote.timeout())
            .user_agent(remote.user_agent.as_str())
            .default_headers(headers);

        if let Some(proxy) = options.proxy_url.as_deref().filter(|p| !p.trim().is_empty()) {
            let proxy = reqwest::Proxy::all(proxy.trim())
                .map_err(|e| RemoteError::Transport(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let http = builder
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            cookies: cookies.to_string(),
            api_base: remote.api_base.trim_end_matches('/').to_string(),
            retry: RetryExecutor::new(options.retry),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Envelope<T>, RemoteError> {
        let url = format!("{}{path}", self.api_base);
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("GET {path} failed: {e}")))?;
        decode(path, resp).await
    }

    async fn identity_once(&self) -> Result<Identity, RemoteError> {
        let env: Envelope<MyInfo> = self.get("/x/space/myinfo", &[]).await?;
        interpret_identity(env)
    }

    async fn items_once(&self, target_uid: i64, count: u32) -> Result<Vec<RemoteItem>, RemoteError> {
        let env: Envelope<ArcSearch> = self
            .get(
                "/x/space/wbi/arc/search",
                &[
                    ("mid", target_uid.to_string()),
                    ("ps", count.to_string()),
                    ("pn", "1".to_string()),
                ],
            )
            .await?;
        interpret_items(env)
    }

    async fn comments_once(&self, item_id: i64, count: u32) -> Result<Vec<RemoteComment>, RemoteError> {
        let env: Envelope<ReplyPage> = self
            .get(
                "/x/v2/reply",
                &[
                    ("type", THREAD_TYPE_VIDEO.to_string()),
                    ("oid", item_id.to_string()),
                    ("ps", count.to_string()),
                    ("pn", "1".to_string()),
                    ("sort", "2".to_string()),
                ],
            )
            .await?;
        interpret_comments(env)
    }

    async fn report_once(
        &self,
        item_id: i64,
        comment_id: i64,
        reason_code: i32,
        csrf: &str,
    ) -> Result<(), RemoteError> {
        let path = "/x/v2/reply/report";
        let form = [
            ("type", THREAD_TYPE_VIDEO.to_string()),
            ("oid", item_id.to_string()),
            ("rpid", comment_id.to_string()),
            ("reason", reason_code.to_string()),
            ("csrf", csrf.to_string()),
        ];
        let resp = self
            .http
            .post(format!("{}{path}", self.api_base))
            .form(&form)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("POST {path} failed: {e}")))?;
        let env: Envelope<serde_json::Value> = decode(path, resp).await?;
        if env.code != 0 {
            return Err(reject(env.code, env.message));
        }
        Ok(())
    }

    async fn user_name_once(&self, uid: i64) -> Result<String, RemoteError> {
        let env: Envelope<AccInfo> = self
            .get("/x/space/acc/info", &[("mid", uid.to_string())])
            .await?;
        if env.code != 0 {
            return Err(reject(env.code, env.message));
        }
        Ok(env.data.unwrap_or_default().name)
    }
}

#[async_trait]
impl Platform for BiliClient {
    async fn fetch_identity(&self) -> Result<Identity, RemoteError> {
        self.retry.execute(move || self.identity_once()).await
    }

    async fn list_items(&self, target_uid: i64, count: u32) -> Result<Vec<RemoteItem>, RemoteError> {
        self.retry
            .execute(move || self.items_once(target_uid, count))
            .await
    }

    async fn list_comments(&self, item_id: i64, count: u32) -> Result<Vec<RemoteComment>, RemoteError> {
        self.retry
            .execute(move || self.comments_once(item_id, count))
            .await
    }

    async fn submit_complaint(
        &self,
        item_id: i64,
        comment_id: i64,
        reason_code: i32,
    ) -> Result<(), RemoteError> {
        // Checked before the retry loop: a missing token never fixes itself.
        let csrf = cookie_value(&self.cookies, "bili_jct").ok_or(RemoteError::MissingCsrfToken)?;
        let csrf = csrf.as_str();
        self.retry
            .execute(move || self.report_once(item_id, comment_id, reason_code, csrf))
            .await
    }

    async fn fetch_user_name(&self, uid: i64) -> Result<String, RemoteError> {
        self.retry.execute(move || self.user_name_once(uid)).await
    }
}

/// Builds [`BiliClient`]s over real HTTP.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    remote: RemoteConfig,
}

impl HttpClientFactory {
    pub fn new(remote: RemoteConfig) -> Self {
        Self { remote }
    }
}

impl ClientFactory for HttpClientFactory {
    fn build(&self, cookies: &str, options: &ClientOptions) -> Result<Arc<dyn Platform>, RemoteError> {
        Ok(Arc::new(BiliClient::new(cookies, options, &self.remote)?))
    }
}

pub(crate) async fn decode<T: DeserializeOwned>(
    path: &str,
    resp: reqwest::Response,
) -> Result<Envelope<T>, RemoteError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(RemoteError::Transport(format!("{path}: HTTP {status}")));
    }
    let env: Envelope<T> = resp
        .json()
        .await
        .map_err(|e| RemoteError::Transport(format!("{path}: invalid response: {e}")))?;
    debug!("{path}: code={}", env.code);
    Ok(env)
}

/// Classify a non-zero application code.
fn reject(code: i64, message: String) -> RemoteError {
    if code == CODE_NOT_LOGGED_IN {
        RemoteError::InvalidCredential
    } else if RATE_LIMIT_CODES.contains(&code) {
        RemoteError::Transport(format!("rate limited (code={code}): {message}"))
    } else {
        RemoteError::PeerRejected { code, message }
    }
}

/// Identity lookups treat every code but "not logged in" as transient.
fn interpret_identity(env: Envelope<MyInfo>) -> Result<Identity, RemoteError> {
    match env.code {
        0 => {
            let info = env.data.unwrap_or_default();
            Ok(Identity {
                uid: info.mid,
                name: info.name,
                avatar_url: info.face,
                level: info.level,
            })
        }
        CODE_NOT_LOGGED_IN => Err(RemoteError::InvalidCredential),
        code => Err(RemoteError::Transport(format!(
            "identity lookup failed (code={code}): {}",
            env.message
        ))),
    }
}

fn interpret_items(env: Envelope<ArcSearch>) -> Result<Vec<RemoteItem>, RemoteError> {
    if env.code != 0 {
        return Err(reject(env.code, env.message));
    }
    Ok(env
        .data
        .unwrap_or_default()
        .list
        .vlist
        .into_iter()
        .map(|v| RemoteItem {
            id: v.aid,
            external_id: v.bvid,
            title: v.title,
            owner_id: v.mid,
            created_at: v.created,
        })
        .collect())
}

fn interpret_comments(env: Envelope<ReplyPage>) -> Result<Vec<RemoteComment>, RemoteError> {
    match env.code {
        0 => {}
        CODE_COMMENTS_DISABLED => return Ok(Vec::new()),
        code => return Err(reject(code, env.message)),
    }
    Ok(env
        .data
        .and_then(|page| page.replies)
        .unwrap_or_default()
        .into_iter()
        .map(|r| RemoteComment {
            id: r.rpid,
            item_id: r.oid,
            author_id: r.mid,
            author_name: r.member.uname,
            body: r.content.message,
            created_at: r.ctime,
        })
        .collect())
}
