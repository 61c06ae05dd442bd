//! Sequential multi-key failover.
//!
//! [`KeyRotationExecutor`] runs an operation with one credential at a time,
//! starting at the caller's [`RotationCursor`] and wrapping around the pool
//! exactly once. The first success moves the cursor to the key that worked;
//! when every key fails the last error is returned.
//!
//! The streaming variant applies the same rotation to *opening* the stream.
//! Once chunks have reached the caller, failures are surfaced as a terminal
//! [`Chunk::Error`] instead of retried, since a retry would replay content.
//! Every stream it returns ends with exactly one [`Chunk::End`].

use crate::auth::{Credential, CredentialPool, RotationCursor};
use bt_domain::error::{Error, Result};
use bt_domain::locale::Locale;
use bt_domain::stream::{BoxStream, Chunk, ChunkStream, Usage};
use bt_domain::trace::TraceEvent;
use futures_util::StreamExt;
use std::future::Future;

#[derive(Debug, Clone)]
pub struct KeyRotationExecutor {
    pool: CredentialPool,
    provider_id: String,
    locale: Locale,
}

impl KeyRotationExecutor {
    pub fn new(pool: CredentialPool, provider_id: impl Into<String>) -> Self {
        Self {
            pool,
            provider_id: provider_id.into(),
            locale: Locale::default(),
        }
    }

    /// Locale used to render [`Chunk::Error`] messages.
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Run `op` with each credential in turn until one succeeds.
    ///
    /// At most `pool.len()` attempts, never two at once, no key tried twice.
    pub async fn execute<T, F, Fut>(&self, cursor: &mut RotationCursor, mut op: F) -> Result<T>
    where
        F: FnMut(Credential) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let len = self.pool.len();
        let start = cursor.start(len);
        let mut last_err: Option<Error> = None;

        for attempt in 0..len {
            let index = (start + attempt) % len;
            match op(self.pool.credential(index)).await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(
                            provider = %self.provider_id,
                            key_index = index,
                            attempts = attempt + 1,
                            "request succeeded after key failover"
                        );
                    }
                    cursor.index = index;
                    return Ok(value);
                }
                Err(e) => {
                    self.log_failure(index, &e);
                    last_err = Some(e);
                }
            }
        }

        TraceEvent::KeysExhausted {
            provider: self.provider_id.clone(),
            attempts: len,
        }
        .emit();
        Err(last_err.unwrap_or_else(|| Error::Auth("credential pool is empty".into())))
    }

    /// Open a stream with failover and wrap it so the caller sees a stream
    /// that never fails as a whole.
    ///
    /// - exhausted keys: `[Error, End]`
    /// - failure after opening: chunks so far, then `Error`, then `End`
    /// - success: chunks, then a single `End` carrying finish reason and usage
    pub async fn execute_stream<F, Fut>(&self, cursor: &mut RotationCursor, op: F) -> ChunkStream
    where
        F: FnMut(Credential) -> Fut,
        Fut: Future<Output = Result<BoxStream<'static, Result<Chunk>>>>,
    {
        match self.execute(cursor, op).await {
            Ok(inner) => terminated(inner, self.provider_id.clone(), self.locale),
            Err(e) => {
                tracing::warn!(
                    provider = %self.provider_id,
                    kind = ?e.kind(),
                    status = ?e.status(),
                    error = %e,
                    "could not open stream with any key"
                );
                let chunks = [error_chunk(&e, self.locale), failed_end()];
                Box::pin(futures_util::stream::iter(chunks))
            }
        }
    }

    fn log_failure(&self, index: usize, error: &Error) {
        let key_suffix = self.pool.suffix(index);
        tracing::warn!(
            provider = %self.provider_id,
            key_index = index,
            key_suffix = %key_suffix,
            status = ?error.status(),
            kind = ?error.kind(),
            error = %error,
            "attempt failed, rotating to next key"
        );
        TraceEvent::KeyAttemptFailed {
            provider: self.provider_id.clone(),
            key_index: index,
            key_suffix,
            status: error.status(),
            error: error.to_string(),
        }
        .emit();
    }
}

/// Render an error as the terminal chunk the caller shows to the user.
pub fn error_chunk(error: &Error, locale: Locale) -> Chunk {
    Chunk::Error {
        kind: error.kind(),
        message: error.user_message(locale),
    }
}

fn failed_end() -> Chunk {
    Chunk::end(Some("error".into()))
}

/// Forward provider chunks, folding every provider `End` into one final
/// `End` and converting the first error into a terminal `Error` chunk.
fn terminated(
    inner: BoxStream<'static, Result<Chunk>>,
    provider_id: String,
    locale: Locale,
) -> ChunkStream {
    let stream = async_stream::stream! {
        let mut inner = inner;
        let mut finish_reason: Option<String> = None;
        let mut usage: Option<Usage> = None;
        let mut failed = false;

        while let Some(item) = inner.next().await {
            match item {
                Ok(Chunk::End { finish_reason: reason, usage: reported }) => {
                    if reason.is_some() {
                        finish_reason = reason;
                    }
                    if reported.is_some() {
                        usage = reported;
                    }
                }
                Ok(chunk @ Chunk::Error { .. }) => {
                    failed = true;
                    yield chunk;
                    break;
                }
                Ok(chunk) => yield chunk,
                Err(e) => {
                    tracing::warn!(
                        provider = %provider_id,
                        kind = ?e.kind(),
                        status = ?e.status(),
                        error = %e,
                        "stream failed after it was opened"
                    );
                    failed = true;
                    yield error_chunk(&e, locale);
                    break;
                }
            }
        }

        if failed {
            yield failed_end();
        } else {
            yield Chunk::End {
                finish_reason: finish_reason.or_else(|| Some("stop".into())),
                usage,
            };
        }
    };

    Box::pin(stream)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use bt_domain::error::{CredentialFailure, ErrorKind, PolicyBlock};
    use std::cell::RefCell;

    fn pool(n: usize) -> CredentialPool {
        CredentialPool::new((0..n).map(|i| format!("key-{i}")).collect()).unwrap()
    }

    fn quota() -> Error {
        Error::Credential {
            provider: "test".into(),
            reason: CredentialFailure::QuotaExceeded,
            status: Some(429),
            message: "quota".into(),
        }
    }

    fn chunks(items: Vec<Result<Chunk>>) -> BoxStream<'static, Result<Chunk>> {
        Box::pin(futures_util::stream::iter(items))
    }

    #[tokio::test]
    async fn only_last_key_succeeds_after_n_attempts() {
        let executor = KeyRotationExecutor::new(pool(4), "test");
        let mut cursor = RotationCursor::default();
        let tried = RefCell::new(Vec::new());

        let out = executor
            .execute(&mut cursor, |cred| {
                tried.borrow_mut().push(cred.index);
                async move {
                    if cred.key == "key-3" {
                        Ok(cred.index)
                    } else {
                        Err(quota())
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(out, 3);
        assert_eq!(*tried.borrow(), vec![0, 1, 2, 3]);
        assert_eq!(cursor.index, 3);

        // The next call starts at the key that worked.
        tried.borrow_mut().clear();
        executor
            .execute(&mut cursor, |cred| {
                tried.borrow_mut().push(cred.index);
                async move { Ok::<_, Error>(()) }
            })
            .await
            .unwrap();
        assert_eq!(*tried.borrow(), vec![3]);
    }

    #[tokio::test]
    async fn rotation_wraps_from_the_cursor() {
        let executor = KeyRotationExecutor::new(pool(3), "test");
        let mut cursor = RotationCursor::new(2);
        let tried = RefCell::new(Vec::new());

        executor
            .execute(&mut cursor, |cred| {
                tried.borrow_mut().push(cred.index);
                async move {
                    if cred.index == 1 {
                        Ok(())
                    } else {
                        Err(Error::Http("connection reset".into()))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(*tried.borrow(), vec![2, 0, 1]);
        assert_eq!(cursor.index, 1);
    }

    #[tokio::test]
    async fn exhaustion_returns_last_error_and_keeps_cursor() {
        let executor = KeyRotationExecutor::new(pool(3), "test");
        let mut cursor = RotationCursor::new(1);
        let mut attempts = 0;

        let err = executor
            .execute(&mut cursor, |cred| {
                attempts += 1;
                async move {
                    Err::<(), _>(Error::Provider {
                        provider: "test".into(),
                        status: 500 + cred.index as u16,
                        message: "boom".into(),
                    })
                }
            })
            .await
            .unwrap_err();

        assert_eq!(attempts, 3);
        // Order was 1, 2, 0: the last error belongs to key 0.
        assert_eq!(err.status(), Some(500));
        assert_eq!(cursor.index, 1);
    }

    #[tokio::test]
    async fn stream_success_ends_once_with_merged_end() {
        let executor = KeyRotationExecutor::new(pool(2), "test");
        let mut cursor = RotationCursor::default();
        let usage = Usage {
            prompt_tokens: 3,
            completion_tokens: 2,
            total_tokens: 5,
        };

        let stream = executor
            .execute_stream(&mut cursor, |_cred| async move {
                Ok(chunks(vec![
                    Ok(Chunk::thought("hmm")),
                    Ok(Chunk::content("Hel")),
                    Ok(Chunk::content("lo")),
                    Ok(Chunk::end(Some("stop".into()))),
                    Ok(Chunk::End {
                        finish_reason: None,
                        usage: Some(usage),
                    }),
                ]))
            })
            .await;
        let out: Vec<Chunk> = stream.collect().await;

        assert_eq!(
            out,
            vec![
                Chunk::thought("hmm"),
                Chunk::content("Hel"),
                Chunk::content("lo"),
                Chunk::End {
                    finish_reason: Some("stop".into()),
                    usage: Some(usage),
                },
            ]
        );
    }

    #[tokio::test]
    async fn stream_without_provider_end_still_ends() {
        let executor = KeyRotationExecutor::new(pool(1), "test");
        let mut cursor = RotationCursor::default();
        let out: Vec<Chunk> = executor
            .execute_stream(&mut cursor, |_cred| async move {
                Ok(chunks(vec![Ok(Chunk::content("partial"))]))
            })
            .await
            .collect()
            .await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], Chunk::end(Some("stop".into())));
    }

    #[tokio::test]
    async fn stream_failover_happens_only_while_opening() {
        let executor = KeyRotationExecutor::new(pool(3), "test");
        let mut cursor = RotationCursor::default();
        let mut opened = 0;

        let out: Vec<Chunk> = executor
            .execute_stream(&mut cursor, |cred| {
                opened += 1;
                async move {
                    if cred.index == 0 {
                        return Err(quota());
                    }
                    Ok(chunks(vec![
                        Ok(Chunk::content("first")),
                        Err(Error::Http("connection reset".into())),
                        Ok(Chunk::content("never seen")),
                    ]))
                }
            })
            .await
            .collect()
            .await;

        assert_eq!(opened, 2);
        assert_eq!(cursor.index, 1);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], Chunk::content("first"));
        assert!(matches!(
            out[1],
            Chunk::Error {
                kind: ErrorKind::Transport,
                ..
            }
        ));
        assert_eq!(out[2], Chunk::end(Some("error".into())));
    }

    #[tokio::test]
    async fn stream_exhaustion_yields_error_then_end() {
        let executor = KeyRotationExecutor::new(pool(2), "test").with_locale(Locale::ZhCn);
        let mut cursor = RotationCursor::default();

        let out: Vec<Chunk> = executor
            .execute_stream(&mut cursor, |_cred| async move {
                Err::<BoxStream<'static, Result<Chunk>>, _>(quota())
            })
            .await
            .collect()
            .await;

        assert_eq!(out.len(), 2);
        match &out[0] {
            Chunk::Error { kind, message } => {
                assert_eq!(*kind, ErrorKind::Credential);
                assert_eq!(message, &quota().user_message(Locale::ZhCn));
                assert!(!message.contains("key-"));
            }
            other => panic!("expected error chunk, got {other:?}"),
        }
        assert!(out[1].is_end());
    }

    #[tokio::test]
    async fn end_is_always_last_and_unique() {
        let executor = KeyRotationExecutor::new(pool(2), "test");
        let scenarios: Vec<Vec<Result<Chunk>>> = vec![
            vec![],
            vec![Ok(Chunk::end(None)), Ok(Chunk::end(Some("length".into())))],
            vec![Err(Error::ContentPolicy {
                provider: "test".into(),
                block: PolicyBlock::Safety,
            })],
            vec![Ok(Chunk::content("a")), Err(Error::Protocol("bad json".into()))],
        ];

        for items in scenarios {
            let mut cursor = RotationCursor::default();
            let mut items = Some(items);
            let out: Vec<Chunk> = executor
                .execute_stream(&mut cursor, |_cred| {
                    let items = items.take().unwrap_or_default();
                    async move { Ok(chunks(items)) }
                })
                .await
                .collect()
                .await;
            assert!(out.last().is_some_and(Chunk::is_end), "{out:?}");
            assert_eq!(out.iter().filter(|c| c.is_end()).count(), 1, "{out:?}");
        }
    }
}
