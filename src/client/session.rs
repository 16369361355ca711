//! Authenticated session against the notebook service and the four workflow calls.

use crate::client::scrape::scrape_tokens;
use crate::client::transport::{HttpResponse, RpcRequest, Transport};
use crate::error::ApiError;
use crate::protocol::procedures::{self, ProcedureId, INFOGRAPHIC_TOOL_TYPE};
use crate::protocol::{
    collect_identifiers, decode_response, encode_request, find_artifact_url, find_identifier_like,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const BATCH_EXECUTE_PATH: &str = "/_/LabsTailwindUi/data/batchexecute";
const LOGIN_MARKERS: [&str; 2] = ["accounts.google.com", "ServiceLogin"];
const REQUEST_ID_STEP: u64 = 1000;

/// Tokens scraped for one session plus the request counter.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub build_label: String,
    pub auth_token: Option<String>,
    request_counter: u64,
}

impl SessionContext {
    pub fn new(
        session_id: String,
        build_label: String,
        auth_token: Option<String>,
        seed: u64,
    ) -> Self {
        Self {
            session_id,
            build_label,
            auth_token,
            request_counter: seed,
        }
    }

    /// Strictly increasing per call.
    pub fn next_request_id(&mut self) -> u64 {
        self.request_counter += REQUEST_ID_STEP;
        self.request_counter
    }
}

#[derive(Debug)]
enum SessionPhase {
    Uninitialized,
    Authenticated(SessionContext),
    /// Terminal for this client instance.
    AuthFailed,
}

/// Waits used inside the client workflow.
#[derive(Debug, Clone, Copy)]
pub struct ClientTimings {
    /// Grace period before listing sources when the add-source reply carries no id.
    pub source_grace: Duration,
    pub poll_interval: Duration,
    pub poll_attempts: u32,
}

impl Default for ClientTimings {
    fn default() -> Self {
        Self {
            source_grace: Duration::from_secs(4),
            poll_interval: Duration::from_secs(2),
            poll_attempts: 90,
        }
    }
}

/// One authenticated session. Created per orchestration run, never persisted.
pub struct SessionClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    language: String,
    timings: ClientTimings,
    phase: SessionPhase,
}

impl SessionClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        language: impl Into<String>,
        timings: ClientTimings,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            language: language.into(),
            timings,
            phase: SessionPhase::Uninitialized,
        }
    }

    pub fn session(&self) -> Option<&SessionContext> {
        match &self.phase {
            SessionPhase::Authenticated(ctx) => Some(ctx),
            _ => None,
        }
    }

    pub fn is_auth_failed(&self) -> bool {
        matches!(self.phase, SessionPhase::AuthFailed)
    }

    /// Fetch the landing page and scrape session tokens.
    pub async fn initialize(&mut self) -> Result<(), ApiError> {
        if self.is_auth_failed() {
            return Err(ApiError::LoginRequired);
        }
        match self.open_session().await {
            Ok(ctx) => {
                info!(build_label = %ctx.build_label, has_auth_token = ctx.auth_token.is_some(), "session initialized");
                self.phase = SessionPhase::Authenticated(ctx);
                Ok(())
            }
            Err(err) => {
                if is_auth_error(&err) {
                    self.phase = SessionPhase::AuthFailed;
                }
                Err(err)
            }
        }
    }

    async fn open_session(&self) -> Result<SessionContext, ApiError> {
        let landing = format!("{}/", self.base_url);
        let response = self.transport.get(&landing).await?;
        debug!(status = response.status, final_url = %response.final_url, "landing page fetched");

        if LOGIN_MARKERS
            .iter()
            .any(|marker| response.final_url.contains(marker))
        {
            return Err(ApiError::LoginRequired);
        }
        if response.status == 401 || response.status == 403 {
            return Err(ApiError::LoginRequired);
        }
        if !response.is_success() {
            return Err(ApiError::Unreachable(response.status));
        }

        let page = response.text();
        let tokens = scrape_tokens(&page);
        let Some(session_id) = tokens.session_id else {
            warn!(page_len = page.len(), "session id not found in landing page");
            return Err(ApiError::LoginRequired);
        };
        Ok(SessionContext::new(
            session_id,
            tokens.build_label,
            tokens.auth_token,
            request_id_seed(),
        ))
    }

    /// Run one remote procedure, initializing the session on first use.
    pub async fn execute_procedure(
        &mut self,
        procedure: ProcedureId,
        payload: &Value,
    ) -> Result<Value, ApiError> {
        if matches!(self.phase, SessionPhase::Uninitialized) {
            self.initialize().await?;
        }
        let request = self.build_request(procedure, payload)?;
        debug!(procedure = %procedure, request_id = ?request.query_value("_reqid"), "executing procedure");

        let response = self.transport.post_form(&request).await?;
        if response.status == 401 || response.status == 403 {
            self.phase = SessionPhase::AuthFailed;
            return Err(ApiError::Unauthorized(response.status));
        }
        if !response.is_success() {
            warn!(procedure = %procedure, status = response.status, "procedure returned non-success status");
        }
        Ok(decode_response(&response.text(), procedure.as_str()))
    }

    fn build_request(
        &mut self,
        procedure: ProcedureId,
        payload: &Value,
    ) -> Result<RpcRequest, ApiError> {
        let ctx = match &mut self.phase {
            SessionPhase::Authenticated(ctx) => ctx,
            _ => return Err(ApiError::LoginRequired),
        };
        let request_id = ctx.next_request_id();
        let query = vec![
            ("rpcids".to_string(), procedure.as_str().to_string()),
            ("f.sid".to_string(), ctx.session_id.clone()),
            ("bl".to_string(), ctx.build_label.clone()),
            ("hl".to_string(), self.language.clone()),
            ("_reqid".to_string(), request_id.to_string()),
            ("rt".to_string(), "c".to_string()),
        ];
        let mut form = vec![(
            "f.req".to_string(),
            encode_request(procedure.as_str(), payload),
        )];
        if let Some(token) = &ctx.auth_token {
            form.push(("at".to_string(), token.clone()));
        }
        Ok(RpcRequest {
            url: format!("{}{}", self.base_url, BATCH_EXECUTE_PATH),
            query,
            form,
        })
    }

    /// Create a notebook and return its id.
    pub async fn create_container(&mut self, title: &str) -> Result<String, ApiError> {
        let response = self
            .execute_procedure(
                ProcedureId::CreateNotebook,
                &procedures::create_notebook(title),
            )
            .await?;
        let slot = response
            .as_array()
            .filter(|fields| fields.len() > 2)
            .and_then(|fields| fields[2].as_str())
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        slot.or_else(|| find_identifier_like(&response))
            .ok_or(ApiError::CreationFailed)
    }

    /// Attach `url` as a source. Asynchronous ingestion sources often reply
    /// without an id; the notebook's source list is consulted after a grace period.
    pub async fn attach_source(&mut self, container_id: &str, url: &str) -> Result<String, ApiError> {
        let response = self
            .execute_procedure(
                ProcedureId::AddSource,
                &procedures::add_source(container_id, url),
            )
            .await?;
        if let Some(source_id) = find_identifier_like(&response) {
            return Ok(source_id);
        }

        debug!(container_id = %container_id, "no source id in reply, listing sources");
        sleep(self.timings.source_grace).await;
        self.list_sources(container_id)
            .await?
            .into_iter()
            .next()
            .ok_or(ApiError::SourceAttachFailed)
    }

    pub async fn list_sources(&mut self, container_id: &str) -> Result<Vec<String>, ApiError> {
        let response = self
            .execute_procedure(
                ProcedureId::ListNotebookContent,
                &procedures::list_content(container_id),
            )
            .await?;
        Ok(collect_identifiers(&response))
    }

    /// Start infographic generation. `None` means the service declined to start
    /// an operation, which is how quota exhaustion shows up.
    pub async fn invoke_tool(
        &mut self,
        container_id: &str,
        source_id: &str,
    ) -> Result<Option<String>, ApiError> {
        let response = self
            .execute_procedure(
                ProcedureId::RunTool,
                &procedures::run_tool(container_id, source_id, INFOGRAPHIC_TOOL_TYPE),
            )
            .await?;
        Ok(response
            .get(0)
            .and_then(Value::as_array)
            .and_then(|row| row.first())
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string))
    }

    /// Poll the notebook listing at a fixed interval until the artifact URL appears.
    pub async fn poll_for_artifact(
        &mut self,
        container_id: &str,
        operation_id: &str,
    ) -> Result<String, ApiError> {
        let attempts = self.timings.poll_attempts;
        info!(operation_id = %operation_id, attempts, "waiting for infographic");
        for attempt in 0..attempts {
            sleep(self.timings.poll_interval).await;
            let response = self
                .execute_procedure(
                    ProcedureId::ListNotebookContent,
                    &procedures::list_content(container_id),
                )
                .await?;
            if attempt % 5 == 0 {
                debug!(attempt = attempt + 1, attempts, "polling for artifact");
            }
            if let Some(url) = find_artifact_url(&response, INFOGRAPHIC_TOOL_TYPE) {
                info!(attempt = attempt + 1, "infographic ready");
                return Ok(url);
            }
        }
        Err(ApiError::Timeout { attempts })
    }

    /// Download a finished artifact.
    pub async fn download(&self, url: &str) -> Result<HttpResponse, ApiError> {
        let response = self.transport.get(url).await?;
        if !response.is_success() {
            return Err(ApiError::Network(format!(
                "artifact download returned status {}",
                response.status
            )));
        }
        Ok(response)
    }
}

fn is_auth_error(err: &ApiError) -> bool {
    matches!(err, ApiError::LoginRequired | ApiError::Unauthorized(_))
}

fn request_id_seed() -> u64 {
    crate::state::now_millis() % 900_000 + 100_000
}
