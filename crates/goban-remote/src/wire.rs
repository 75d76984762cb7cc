//! Platform JSON shapes.

use serde::Deserialize;

/// Common `{code, message, data}` response wrapper.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub code: i64,
    #[serde(default, alias = "msg")]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct MyInfo {
    pub mid: i64,
    #[serde(alias = "uname")]
    pub name: String,
    pub face: String,
    pub level: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ArcSearch {
    pub list: ArcList,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ArcList {
    pub vlist: Vec<Video>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Video {
    pub aid: i64,
    pub bvid: String,
    pub title: String,
    pub mid: i64,
    pub created: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ReplyPage {
    pub replies: Option<Vec<Reply>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Reply {
    pub rpid: i64,
    pub oid: i64,
    pub mid: i64,
    pub content: ReplyContent,
    pub member: ReplyMember,
    pub ctime: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ReplyContent {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ReplyMember {
    pub uname: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AccInfo {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LoginUrl {
    pub url: String,
    #[serde(rename = "oauthKey")]
    pub oauth_key: String,
}

/// Legacy web login poll reply. `data` is an object on success and a bare
/// status number otherwise.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginInfo {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub data: serde_json::Value,
}
