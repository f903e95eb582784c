//! The HTTP dispatcher: a worker pool draining the batch channel
//! concurrently, each request retried with backoff and classified by
//! status (`spec.md` §4.6/§4.8). Unlike the transform chain and batcher,
//! this stage is explicitly NOT single-stream — `config.workers` tasks
//! share one channel receiver behind a mutex, the simplest way to fan a
//! single mpsc out across a worker pool without a broadcast channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use ingest_core::endpoint::{self, EndpointInfo, HttpMethod};
use ingest_core::record::Batch;
use ingest_core::traits::{BatchMessage, BatchRx, Operator};
use ingest_core::{AuthHeader, JobState, Sink};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::encode::{encode, maybe_compress};
use crate::retry::{classify_status, classify_transport_error, new_backoff, Classification};

pub struct Dispatcher {
    state: Arc<JobState>,
    client: reqwest::Client,
    name: String,
}

impl Dispatcher {
    pub fn new(state: Arc<JobState>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Dispatcher {
            state,
            client,
            name: "dispatcher".to_string(),
        })
    }
}

#[async_trait]
impl Operator for Dispatcher {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Sink for Dispatcher {
    async fn run(&mut self, rx: BatchRx, cancel: CancellationToken) -> anyhow::Result<()> {
        let rx = Arc::new(AsyncMutex::new(rx));
        let worker_count = self.state.config.workers.max(1);
        let endpoint = Arc::new(endpoint::resolve(
            self.state.config.region,
            self.state.config.record_type,
            self.state.config.table_id.as_deref(),
        ));

        let mut handles = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let rx = rx.clone();
            let state = self.state.clone();
            let client = self.client.clone();
            let cancel = cancel.clone();
            let endpoint = endpoint.clone();
            handles.push(tokio::spawn(async move {
                worker_loop(id, rx, state, client, endpoint, cancel).await
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
        Ok(())
    }
}

async fn worker_loop(
    id: usize,
    rx: Arc<AsyncMutex<BatchRx>>,
    state: Arc<JobState>,
    client: reqwest::Client,
    endpoint: Arc<EndpointInfo>,
    cancel: CancellationToken,
) {
    loop {
        let msg = {
            let mut guard = rx.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                msg = guard.recv() => msg,
            }
        };
        let Some(msg) = msg else { break };
        match msg {
            BatchMessage::Eos => break,
            BatchMessage::Batch(batch) => {
                dispatch_one(id, &state, &client, &endpoint, batch).await;
                state.maybe_emit_progress(Duration::from_millis(250));
            }
        }
    }
}

async fn dispatch_one(
    worker_id: usize,
    state: &JobState,
    client: &reqwest::Client,
    endpoint: &EndpointInfo,
    batch: Batch,
) {
    let batch_len = batch.len();
    let sample_id = batch
        .records
        .first()
        .and_then(|r| r.get("event").or_else(|| r.get("$distinct_id")))
        .map(|v| v.to_string())
        .unwrap_or_default();

    let body = match encode(&batch, endpoint.content_type) {
        Ok(b) => b,
        Err(e) => {
            warn!(worker_id, error = %e, "batch encode error, dropping batch");
            state.counters.incr_failed(batch_len as u64);
            return;
        }
    };
    let body = match maybe_compress(body, state.config.compress, state.config.compression_level) {
        Ok(b) => b,
        Err(e) => {
            warn!(worker_id, error = %e, "batch compress error, dropping batch");
            state.counters.incr_failed(batch_len as u64);
            return;
        }
    };
    let body_len = body.len() as u64;

    let mut backoff = new_backoff();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let mut request = match endpoint.method {
            HttpMethod::Get => client.get(&endpoint.url),
            HttpMethod::Post => client.post(&endpoint.url),
            HttpMethod::Put => client.put(&endpoint.url),
        };
        request = request
            .header(reqwest::header::CONTENT_TYPE, endpoint.content_type.header_value())
            .body(body.clone());
        if state.config.compress {
            request = request.header(reqwest::header::CONTENT_ENCODING, "gzip");
        }
        request = apply_auth(request, &state.auth);

        state.counters.incr_requests(1);
        let outcome = request.send().await;

        match outcome {
            Ok(response) => {
                let status = response.status().as_u16();
                let retry_after = parse_retry_after(response.headers());
                let message = response.text().await.unwrap_or_default();
                state.store_response(status, &message, batch_len, &sample_id);

                if (200..300).contains(&status) {
                    state.counters.incr_success(batch_len as u64);
                    state.counters.incr_bytes(body_len);
                    return;
                }

                match classify_status(status) {
                    Classification::Permanent => {
                        state.counters.incr_failed(batch_len as u64);
                        if status == 429 {
                            state.counters.incr_rate_limited(1);
                        } else if status >= 500 {
                            state.counters.incr_server_errors(1);
                        } else {
                            state.counters.incr_client_errors(1);
                        }
                        return;
                    }
                    Classification::Retryable => {
                        if status == 429 {
                            state.counters.incr_rate_limited(1);
                        } else {
                            state.counters.incr_server_errors(1);
                        }
                        if !retry_or_give_up(state, &mut backoff, attempt, batch_len, retry_after)
                            .await
                        {
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(worker_id, attempt, error = %e, "dispatch transport error");
                let _ = classify_transport_error();
                if !retry_or_give_up(state, &mut backoff, attempt, batch_len, None).await {
                    return;
                }
            }
        }
    }
}

/// Returns `true` if the caller should retry, `false` if retries are
/// exhausted (and the failure has already been counted). A `Retry-After`
/// value, when given, overrides the backoff's own jittered wait for this
/// attempt — the backoff still advances its internal state so the next
/// attempt (absent another `Retry-After`) keeps escalating from where it
/// left off.
async fn retry_or_give_up(
    state: &JobState,
    backoff: &mut backoff::ExponentialBackoff,
    attempt: u32,
    batch_len: usize,
    retry_after: Option<Duration>,
) -> bool {
    if attempt > state.config.max_retries {
        state.counters.incr_failed(batch_len as u64);
        return false;
    }
    state.counters.incr_retries(1);
    let backoff_wait = backoff.next_backoff().unwrap_or(Duration::from_secs(30));
    let wait = retry_after.unwrap_or(backoff_wait);
    debug!(
        attempt,
        wait_ms = wait.as_millis(),
        honored_retry_after = retry_after.is_some(),
        "retrying batch dispatch"
    );
    tokio::time::sleep(wait).await;
    true
}

/// Parses a `Retry-After` header as a whole number of seconds. The
/// HTTP-date form is not handled — none of the supported endpoints are
/// known to send it, and a missing/unparseable header just falls back to
/// the backoff's own wait.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let value = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;
    let secs: u64 = value.trim().parse().ok()?;
    Some(Duration::from_secs(secs))
}

fn apply_auth(request: reqwest::RequestBuilder, auth: &AuthHeader) -> reqwest::RequestBuilder {
    match auth {
        AuthHeader::Basic(value) => request.header(reqwest::header::AUTHORIZATION, value.clone()),
        AuthHeader::Bearer(token) => {
            request.header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"))
        }
        AuthHeader::None => request,
    }
}
