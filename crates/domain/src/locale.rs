//! User-facing rendering of errors.
//!
//! Raw errors (status codes, provider bodies, key suffixes) only ever go to
//! the log. What reaches the end user is one of the sentences below.

use crate::error::{CredentialFailure, Error, PolicyBlock};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "zh-CN", alias = "zh")]
    ZhCn,
}

impl Error {
    /// Render this error as a short, localized sentence for the end user.
    pub fn user_message(&self, locale: Locale) -> String {
        let (en, zh) = match self {
            Error::Credential { reason, .. } => match reason {
                CredentialFailure::Invalid => (
                    "The API key is invalid. Check the key in your settings.",
                    "API 密钥无效，请在设置中检查密钥。",
                ),
                CredentialFailure::Expired => (
                    "The API key has expired. Please renew it.",
                    "API 密钥已过期，请更新。",
                ),
                CredentialFailure::QuotaExceeded => (
                    "All API keys have run out of quota. Try again later or add another key.",
                    "所有 API 密钥的配额均已用尽，请稍后重试或添加新的密钥。",
                ),
                CredentialFailure::PermissionDenied => (
                    "The API key does not have permission to use this model.",
                    "该 API 密钥无权使用此模型。",
                ),
            },
            Error::Auth(_) => (
                "No API key is configured for this provider.",
                "当前服务商未配置 API 密钥。",
            ),
            Error::Http(_) => (
                "Network error. Check your connection or proxy settings.",
                "网络错误，请检查网络连接或代理设置。",
            ),
            Error::Timeout(_) => (
                "The request timed out. Please try again.",
                "请求超时，请重试。",
            ),
            Error::Provider { status, .. } if *status >= 500 => (
                "The model service is temporarily unavailable. Please try again.",
                "模型服务暂时不可用，请重试。",
            ),
            Error::Provider { .. } => (
                "The model service rejected the request.",
                "模型服务拒绝了该请求。",
            ),
            Error::ContentPolicy { block, .. } => match block {
                PolicyBlock::Safety => (
                    "The response was blocked by the provider's safety filter.",
                    "回复被服务商的安全策略拦截。",
                ),
                PolicyBlock::Recitation => (
                    "The response was blocked because it recited protected content.",
                    "回复因引用受保护内容而被拦截。",
                ),
                PolicyBlock::ContentFilter => (
                    "The response was removed by the content filter.",
                    "回复被内容过滤器移除。",
                ),
                PolicyBlock::MaxTokens => (
                    "The response hit the maximum output length before any text was produced.",
                    "回复在生成任何文本前就达到了最大输出长度。",
                ),
            },
            Error::Json(_) | Error::Protocol(_) => (
                "The model service returned a response that could not be read.",
                "无法解析模型服务返回的响应。",
            ),
            Error::PayloadTooLarge { .. } => (
                "The conversation is too large to send, even after trimming.",
                "对话内容过大，裁剪后仍无法发送。",
            ),
            Error::Io(_) | Error::Config(_) | Error::Other(_) => (
                "Something went wrong. Please try again.",
                "发生未知错误，请重试。",
            ),
        };
        match locale {
            Locale::En => en.to_string(),
            Locale::ZhCn => zh.to_string(),
        }
    }
}
