use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::multipart::{Form as MultipartForm, Part as MultipartPart};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;

use stil_contracts::advice::{
    ChatReply, EventCombos, FitScore, StyleAnalysis, StyleProfile, VisualCombo,
};
use stil_contracts::analytics::ReturnAnalytics;
use stil_contracts::catalog::Product;
use stil_contracts::chat::{self, ChatMessage};
use stil_contracts::events::{EventLog, EventPayload};

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

pub const SINGLE_FILE_REQUIRED: &str = "Lütfen analiz için bir resim dosyası seçin.";
pub const PROFILE_MIN_IMAGES: &str = "Lütfen stil radarınız için en az 2 resim seçin.";
pub const EVENT_REQUEST_REQUIRED: &str = "Lütfen davet veya etkinlik için bir istek yazın.";
pub const COMBO_RENDER_ERROR: &str = "Kombin görselleştirilirken bir hata oluştu.";
pub const ANALYTICS_FETCH_ERROR: &str = "Rapor verileri alınırken bir hata oluştu.";
pub const PRODUCT_FETCH_ERROR: &str = "Ürün yüklenirken bir hata oluştu.";

pub fn api_base_from_env() -> String {
    non_empty_env("STIL_API_BASE")
        .map(|value| value.trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
}

/// Outcome of one outbound call, normalized so the slot layer can pick the
/// user-facing message without re-inspecting the transport.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Non-success response carrying a human-readable `detail` field.
    #[error("{0}")]
    Rejected(String),
    /// Non-success response without a usable detail message.
    #[error("request failed ({0})")]
    Status(u16),
    /// Network or decoding failure before a payload existed.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn detail(&self) -> Option<&str> {
        match self {
            GatewayError::Rejected(detail) => Some(detail),
            _ => None,
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

pub trait StyleGateway: Send + Sync {
    fn analyze_style(&self, file: &Path) -> GatewayResult<StyleAnalysis>;
    fn create_style_profile(&self, files: &[PathBuf]) -> GatewayResult<StyleProfile>;
    fn event_stylist(&self, user_request: &str) -> GatewayResult<EventCombos>;
    fn chat(&self, message: &str, product: &str) -> GatewayResult<ChatReply>;
    fn fit_score(&self, body_type: &str, product_id: u64) -> GatewayResult<FitScore>;
    fn visualize_combo(&self, main_item: &str, matched_items: &[String])
        -> GatewayResult<VisualCombo>;
    fn return_analytics(&self) -> GatewayResult<ReturnAnalytics>;
    fn product(&self, id: u64) -> GatewayResult<Product>;
}

pub struct HttpGateway {
    api_base: String,
    http: HttpClient,
}

impl HttpGateway {
    pub fn new(api_base: impl Into<String>) -> Self {
        let api_base = api_base.into().trim().trim_end_matches('/').to_string();
        Self {
            api_base,
            http: HttpClient::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(api_base_from_env())
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> GatewayResult<T> {
        let endpoint = self.endpoint(path);
        let response = self
            .http
            .post(&endpoint)
            .json(body)
            .send()
            .with_context(|| format!("request failed ({endpoint})"))?;
        decode(response)
    }

    fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: MultipartForm,
    ) -> GatewayResult<T> {
        let endpoint = self.endpoint(path);
        let response = self
            .http
            .post(&endpoint)
            .multipart(form)
            .send()
            .with_context(|| format!("upload failed ({endpoint})"))?;
        decode(response)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        let endpoint = self.endpoint(path);
        let response = self
            .http
            .get(&endpoint)
            .send()
            .with_context(|| format!("request failed ({endpoint})"))?;
        decode(response)
    }
}

impl StyleGateway for HttpGateway {
    fn analyze_style(&self, file: &Path) -> GatewayResult<StyleAnalysis> {
        let form = MultipartForm::new().part("file", file_part(file)?);
        self.post_multipart("/api/analyze-style", form)
    }

    fn create_style_profile(&self, files: &[PathBuf]) -> GatewayResult<StyleProfile> {
        let mut form = MultipartForm::new();
        for file in files {
            form = form.part("files", file_part(file)?);
        }
        self.post_multipart("/api/create-style-profile", form)
    }

    fn event_stylist(&self, user_request: &str) -> GatewayResult<EventCombos> {
        self.post_json("/api/event-stylist", &json!({ "user_request": user_request }))
    }

    fn chat(&self, message: &str, product: &str) -> GatewayResult<ChatReply> {
        self.post_json(
            "/api/chat",
            &json!({ "message": message, "product": product }),
        )
    }

    fn fit_score(&self, body_type: &str, product_id: u64) -> GatewayResult<FitScore> {
        self.post_json(
            "/api/fit-score",
            &json!({ "user_body_type": body_type, "product_id": product_id }),
        )
    }

    fn visualize_combo(
        &self,
        main_item: &str,
        matched_items: &[String],
    ) -> GatewayResult<VisualCombo> {
        self.post_json(
            "/api/generate-visual-combo",
            &json!({ "main_item": main_item, "matched_items": matched_items }),
        )
    }

    fn return_analytics(&self) -> GatewayResult<ReturnAnalytics> {
        self.get_json("/api/return-analytics")
    }

    fn product(&self, id: u64) -> GatewayResult<Product> {
        self.get_json(&format!("/api/products/{id}"))
    }
}

fn decode<T: DeserializeOwned>(response: HttpResponse) -> GatewayResult<T> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .context("response body read failed")
        .map_err(GatewayError::Transport)?;
    if !status.is_success() {
        return Err(match detail_from_body(&body) {
            Some(detail) => GatewayError::Rejected(detail),
            None => GatewayError::Status(code),
        });
    }
    serde_json::from_str(&body)
        .with_context(|| {
            format!(
                "service returned invalid JSON payload: {}",
                truncate_text(&body, 256)
            )
        })
        .map_err(GatewayError::Transport)
}

fn detail_from_body(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed
        .get("detail")?
        .as_str()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn file_part(path: &Path) -> GatewayResult<MultipartPart> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed reading {}", path.display()))
        .map_err(GatewayError::Transport)?;
    let file_name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("upload")
        .to_string();
    MultipartPart::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime_for_path(path))
        .context("invalid mime type for upload part")
        .map_err(GatewayError::Transport)
}

fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowKind {
    SingleAnalysis,
    ProfileAnalysis,
    EventStylist,
}

impl WorkflowKind {
    pub const ALL: [WorkflowKind; 3] = [
        WorkflowKind::SingleAnalysis,
        WorkflowKind::ProfileAnalysis,
        WorkflowKind::EventStylist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::SingleAnalysis => "single_analysis",
            WorkflowKind::ProfileAnalysis => "profile_analysis",
            WorkflowKind::EventStylist => "event_stylist",
        }
    }

    fn fallback_error(&self) -> &'static str {
        match self {
            WorkflowKind::SingleAnalysis => "Analiz sırasında bir hata oluştu.",
            WorkflowKind::ProfileAnalysis => "Stil profili oluşturulurken bir hata oluştu.",
            WorkflowKind::EventStylist => "Kombin önerileri alınırken bir hata oluştu.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Idle,
    Validating,
    InFlight,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowResult {
    Analysis(StyleAnalysis),
    Profile(StyleProfile),
    Combos(EventCombos),
}

/// State container for one home workflow. `validation_error` is local to
/// the slot and never set by transport failures; `result` and `error` are
/// the arbitrated surface fields and at most one of them is non-empty.
#[derive(Debug, Clone)]
pub struct WorkflowSlot {
    pub kind: WorkflowKind,
    pub status: SlotStatus,
    pub result: Option<WorkflowResult>,
    pub error: Option<String>,
    pub validation_error: Option<String>,
}

impl WorkflowSlot {
    fn new(kind: WorkflowKind) -> Self {
        Self {
            kind,
            status: SlotStatus::Idle,
            result: None,
            error: None,
            validation_error: None,
        }
    }

    pub fn analysis(&self) -> Option<&StyleAnalysis> {
        match &self.result {
            Some(WorkflowResult::Analysis(analysis)) => Some(analysis),
            _ => None,
        }
    }

    pub fn profile(&self) -> Option<&StyleProfile> {
        match &self.result {
            Some(WorkflowResult::Profile(profile)) => Some(profile),
            _ => None,
        }
    }

    pub fn combos(&self) -> Option<&EventCombos> {
        match &self.result {
            Some(WorkflowResult::Combos(combos)) => Some(combos),
            _ => None,
        }
    }
}

/// Request payload for the follow-on combo visualization, derived from the
/// currently held single-analysis result.
#[derive(Debug, Clone, PartialEq)]
pub struct ComboRequest {
    pub main_item: String,
    pub matched_items: Vec<String>,
}

/// Owns the three sibling workflow slots that share the home result surface
/// and arbitrates which of them is active. Arbitration state is rebuilt
/// fresh per view mount; nothing here persists.
#[derive(Debug, Clone)]
pub struct HomeBench {
    single: WorkflowSlot,
    profile: WorkflowSlot,
    event: WorkflowSlot,
    active: Option<WorkflowKind>,
    combo: Option<VisualCombo>,
    combo_loading: bool,
    combo_error: Option<String>,
}

impl Default for HomeBench {
    fn default() -> Self {
        Self::new()
    }
}

impl HomeBench {
    pub fn new() -> Self {
        Self {
            single: WorkflowSlot::new(WorkflowKind::SingleAnalysis),
            profile: WorkflowSlot::new(WorkflowKind::ProfileAnalysis),
            event: WorkflowSlot::new(WorkflowKind::EventStylist),
            active: None,
            combo: None,
            combo_loading: false,
            combo_error: None,
        }
    }

    pub fn slot(&self, kind: WorkflowKind) -> &WorkflowSlot {
        match kind {
            WorkflowKind::SingleAnalysis => &self.single,
            WorkflowKind::ProfileAnalysis => &self.profile,
            WorkflowKind::EventStylist => &self.event,
        }
    }

    fn slot_mut(&mut self, kind: WorkflowKind) -> &mut WorkflowSlot {
        match kind {
            WorkflowKind::SingleAnalysis => &mut self.single,
            WorkflowKind::ProfileAnalysis => &mut self.profile,
            WorkflowKind::EventStylist => &mut self.event,
        }
    }

    pub fn active(&self) -> Option<WorkflowKind> {
        self.active
    }

    pub fn combo(&self) -> Option<&VisualCombo> {
        self.combo.as_ref()
    }

    pub fn combo_loading(&self) -> bool {
        self.combo_loading
    }

    pub fn combo_error(&self) -> Option<&str> {
        self.combo_error.as_deref()
    }

    pub fn begin_single(&mut self, file: Option<&Path>) -> bool {
        if self.single.status == SlotStatus::InFlight {
            return false;
        }
        self.single.status = SlotStatus::Validating;
        if file.is_none() {
            self.single.status = SlotStatus::Idle;
            self.single.validation_error = Some(SINGLE_FILE_REQUIRED.to_string());
            return false;
        }
        self.activate(WorkflowKind::SingleAnalysis);
        true
    }

    pub fn begin_profile(&mut self, files: &[PathBuf]) -> bool {
        if self.profile.status == SlotStatus::InFlight {
            return false;
        }
        self.profile.status = SlotStatus::Validating;
        if files.len() < 2 {
            self.profile.status = SlotStatus::Idle;
            self.profile.validation_error = Some(PROFILE_MIN_IMAGES.to_string());
            return false;
        }
        self.activate(WorkflowKind::ProfileAnalysis);
        true
    }

    pub fn begin_event(&mut self, user_request: &str) -> bool {
        if self.event.status == SlotStatus::InFlight {
            return false;
        }
        self.event.status = SlotStatus::Validating;
        if user_request.trim().is_empty() {
            self.event.status = SlotStatus::Idle;
            self.event.validation_error = Some(EVENT_REQUEST_REQUIRED.to_string());
            return false;
        }
        self.activate(WorkflowKind::EventStylist);
        true
    }

    /// Last-writer-wins arbitration: the slot entering flight becomes the
    /// active kind and every sibling's surface fields are cleared now, even
    /// if this request later fails.
    fn activate(&mut self, kind: WorkflowKind) {
        for sibling in WorkflowKind::ALL {
            if sibling == kind {
                continue;
            }
            let slot = self.slot_mut(sibling);
            slot.result = None;
            slot.error = None;
        }
        let slot = self.slot_mut(kind);
        slot.result = None;
        slot.error = None;
        slot.validation_error = None;
        slot.status = SlotStatus::InFlight;
        self.active = Some(kind);
        self.combo = None;
        self.combo_loading = false;
        self.combo_error = None;
    }

    pub fn complete_single(&mut self, outcome: GatewayResult<StyleAnalysis>) {
        self.complete(
            WorkflowKind::SingleAnalysis,
            outcome.map(WorkflowResult::Analysis),
        );
    }

    pub fn complete_profile(&mut self, outcome: GatewayResult<StyleProfile>) {
        self.complete(
            WorkflowKind::ProfileAnalysis,
            outcome.map(WorkflowResult::Profile),
        );
    }

    pub fn complete_event(&mut self, outcome: GatewayResult<EventCombos>) {
        self.complete(WorkflowKind::EventStylist, outcome.map(WorkflowResult::Combos));
    }

    // Completion writes unconditionally and does not re-arbitrate: a slow
    // earlier response can land after a newer sibling activated and its
    // result then sits next to the newer kind's pending surface. Known race
    // carried over from the source design; covered by tests.
    fn complete(&mut self, kind: WorkflowKind, outcome: GatewayResult<WorkflowResult>) {
        let slot = self.slot_mut(kind);
        match outcome {
            Ok(result) => {
                slot.status = SlotStatus::Succeeded;
                slot.result = Some(result);
                slot.error = None;
            }
            Err(err) => {
                slot.status = SlotStatus::Failed;
                slot.error = Some(
                    err.detail()
                        .map(str::to_string)
                        .unwrap_or_else(|| kind.fallback_error().to_string()),
                );
                slot.result = None;
            }
        }
    }

    /// Follow-on visualization is only available while a single-analysis
    /// result is held; it never touches the analysis result itself.
    pub fn begin_combo(&mut self) -> Option<ComboRequest> {
        if self.combo_loading {
            return None;
        }
        let analysis = match self.single.analysis() {
            Some(analysis) => analysis,
            None => return None,
        };
        let request = ComboRequest {
            main_item: analysis.image_analysis.item_description.clone(),
            matched_items: analysis
                .matched_products
                .iter()
                .map(|product| product.name.clone())
                .collect(),
        };
        self.combo = None;
        self.combo_error = None;
        self.combo_loading = true;
        Some(request)
    }

    pub fn complete_combo(&mut self, outcome: GatewayResult<VisualCombo>) {
        self.combo_loading = false;
        match outcome {
            Ok(combo) => {
                self.combo = Some(combo);
                self.combo_error = None;
            }
            Err(_) => {
                self.combo_error = Some(COMBO_RENDER_ERROR.to_string());
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    AwaitingUserInput,
    WaitingForReply,
}

/// The outbound half of one chat turn, ready to hand to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundTurn {
    pub message: String,
    pub product: String,
}

/// Conversational state machine scoped to one product context. Created per
/// modal open, discarded on close; reopening always reseeds the greeting.
#[derive(Debug, Clone)]
pub struct ChatSession {
    context: String,
    transcript: Vec<ChatMessage>,
    turn: TurnStatus,
}

impl ChatSession {
    pub fn open(context: &str) -> Option<Self> {
        let context = context.trim();
        if context.is_empty() {
            return None;
        }
        Some(Self {
            context: context.to_string(),
            transcript: vec![ChatMessage::bot(chat::greeting(context))],
            turn: TurnStatus::AwaitingUserInput,
        })
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn turn(&self) -> TurnStatus {
        self.turn
    }

    /// Appends the user message optimistically and yields the request to
    /// issue. Blank text or a pending reply makes this a no-op.
    pub fn send(&mut self, text: &str) -> Option<OutboundTurn> {
        let text = text.trim();
        if text.is_empty() || self.turn == TurnStatus::WaitingForReply {
            return None;
        }
        self.transcript.push(ChatMessage::user(text));
        self.turn = TurnStatus::WaitingForReply;
        Some(OutboundTurn {
            message: text.to_string(),
            product: self.context.clone(),
        })
    }

    pub fn on_reply(&mut self, text: &str) {
        self.transcript.push(ChatMessage::bot(text));
        self.turn = TurnStatus::AwaitingUserInput;
    }

    /// Chat failures are downgraded to a fixed apology; the session stays
    /// usable.
    pub fn on_failure(&mut self) {
        self.transcript.push(ChatMessage::bot(chat::FAILURE_REPLY));
        self.turn = TurnStatus::AwaitingUserInput;
    }
}

/// Latest dashboard snapshot plus the most recent fetch failure. The
/// snapshot is replaced wholesale on success and kept on failure.
#[derive(Debug, Clone, Default)]
pub struct ReportState {
    pub snapshot: Option<ReturnAnalytics>,
    pub last_error: Option<String>,
}

impl ReportState {
    pub fn apply(&mut self, outcome: GatewayResult<ReturnAnalytics>) {
        match outcome {
            Ok(report) => {
                self.snapshot = Some(report);
                self.last_error = None;
            }
            Err(_) => {
                self.last_error = Some(ANALYTICS_FETCH_ERROR.to_string());
            }
        }
    }
}

/// Fixed-interval refresh loop for the return-analytics report. Fetches
/// once immediately, then once per interval; a failed tick never stops the
/// loop. Owns exactly one timer thread; `stop` is idempotent and dropping
/// the poller stops it.
pub struct AnalyticsPoller {
    state: Arc<Mutex<ReportState>>,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl AnalyticsPoller {
    pub fn start(gateway: Arc<dyn StyleGateway>, interval: Duration) -> Self {
        let state = Arc::new(Mutex::new(ReportState::default()));
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let tick_state = Arc::clone(&state);
        let handle = thread::spawn(move || loop {
            let outcome = gateway.return_analytics();
            if let Ok(mut guard) = tick_state.lock() {
                guard.apply(outcome);
            }
            match stop_rx.recv_timeout(interval) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        });
        Self {
            state,
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }

    pub fn report(&self) -> ReportState {
        self.state
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AnalyticsPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStatus {
    Idle,
    InFlight,
    Succeeded,
    Failed,
}

/// Outbound fit-score query for one `(body type, product)` key.
#[derive(Debug, Clone, PartialEq)]
pub struct FitQuery {
    pub body_type: String,
    pub product_id: u64,
}

/// Single-slot, keyed lookup. A prior score stays visible until the new one
/// resolves; completion always overwrites, never merges.
#[derive(Debug, Clone)]
pub struct FitScoreLookup {
    status: LookupStatus,
    key: Option<(String, u64)>,
    score: Option<FitScore>,
}

impl Default for FitScoreLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl FitScoreLookup {
    pub fn new() -> Self {
        Self {
            status: LookupStatus::Idle,
            key: None,
            score: None,
        }
    }

    pub fn status(&self) -> LookupStatus {
        self.status
    }

    pub fn score(&self) -> Option<&FitScore> {
        self.score.as_ref()
    }

    pub fn begin(&mut self, body_type: &str, product_id: u64) -> Option<FitQuery> {
        let body_type = body_type.trim();
        if body_type.is_empty() {
            return None;
        }
        let key = (body_type.to_string(), product_id);
        if self.status == LookupStatus::InFlight && self.key.as_ref() == Some(&key) {
            return None;
        }
        self.key = Some(key);
        self.status = LookupStatus::InFlight;
        Some(FitQuery {
            body_type: body_type.to_string(),
            product_id,
        })
    }

    /// A transport failure still yields a displayable placeholder rather
    /// than an ambiguous empty surface.
    pub fn complete(&mut self, outcome: GatewayResult<FitScore>) {
        match outcome {
            Ok(score) => {
                self.status = LookupStatus::Succeeded;
                self.score = Some(score);
            }
            Err(_) => {
                self.status = LookupStatus::Failed;
                self.score = Some(FitScore::unavailable());
            }
        }
    }
}

/// Product-detail load state for one page view.
#[derive(Debug, Clone, Default)]
pub struct ProductView {
    pub product: Option<Product>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ProductView {
    pub fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn complete(&mut self, outcome: GatewayResult<Product>) {
        self.loading = false;
        match outcome {
            Ok(product) => {
                self.product = Some(product);
            }
            Err(_) => {
                self.error = Some(PRODUCT_FETCH_ERROR.to_string());
            }
        }
    }
}

/// Owns every orchestration unit for one session and records a JSONL event
/// per transition. The consuming surface reads state back through the
/// accessors; nothing here outlives the engine.
pub struct StilEngine {
    gateway: Arc<dyn StyleGateway>,
    events: EventLog,
    bench: HomeBench,
    chat: Option<ChatSession>,
    fit: FitScoreLookup,
    product_view: ProductView,
}

impl StilEngine {
    pub fn new(gateway: Arc<dyn StyleGateway>, events_path: impl Into<PathBuf>) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        let events = EventLog::new(events_path.into(), session_id);
        Self {
            gateway,
            events,
            bench: HomeBench::new(),
            chat: None,
            fit: FitScoreLookup::new(),
            product_view: ProductView::default(),
        }
    }

    pub fn bench(&self) -> &HomeBench {
        &self.bench
    }

    pub fn chat(&self) -> Option<&ChatSession> {
        self.chat.as_ref()
    }

    pub fn fit(&self) -> &FitScoreLookup {
        &self.fit
    }

    pub fn product_view(&self) -> &ProductView {
        &self.product_view
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn gateway(&self) -> Arc<dyn StyleGateway> {
        Arc::clone(&self.gateway)
    }

    pub fn run_single_analysis(&mut self, file: Option<&Path>) -> Result<()> {
        if !self.bench.begin_single(file) {
            return Ok(());
        }
        let path = match file {
            Some(path) => path,
            None => return Ok(()),
        };
        self.record_submit(WorkflowKind::SingleAnalysis)?;
        let outcome = self.gateway.analyze_style(path);
        self.record_outcome(WorkflowKind::SingleAnalysis, &outcome)?;
        self.bench.complete_single(outcome);
        Ok(())
    }

    pub fn run_style_profile(&mut self, files: &[PathBuf]) -> Result<()> {
        if !self.bench.begin_profile(files) {
            return Ok(());
        }
        self.record_submit(WorkflowKind::ProfileAnalysis)?;
        let outcome = self.gateway.create_style_profile(files);
        self.record_outcome(WorkflowKind::ProfileAnalysis, &outcome)?;
        self.bench.complete_profile(outcome);
        Ok(())
    }

    pub fn run_event_stylist(&mut self, user_request: &str) -> Result<()> {
        if !self.bench.begin_event(user_request) {
            return Ok(());
        }
        self.record_submit(WorkflowKind::EventStylist)?;
        let outcome = self.gateway.event_stylist(user_request.trim());
        self.record_outcome(WorkflowKind::EventStylist, &outcome)?;
        self.bench.complete_event(outcome);
        Ok(())
    }

    pub fn run_visual_combo(&mut self) -> Result<()> {
        let request = match self.bench.begin_combo() {
            Some(request) => request,
            None => return Ok(()),
        };
        self.events.record(
            "combo_submitted",
            payload(json!({ "main_item": request.main_item })),
        )?;
        let outcome = self
            .gateway
            .visualize_combo(&request.main_item, &request.matched_items);
        self.events.record(
            if outcome.is_ok() {
                "combo_succeeded"
            } else {
                "combo_failed"
            },
            EventPayload::new(),
        )?;
        self.bench.complete_combo(outcome);
        Ok(())
    }

    pub fn open_chat(&mut self, product: &str) -> Result<bool> {
        match ChatSession::open(product) {
            Some(session) => {
                self.events.record(
                    "chat_opened",
                    payload(json!({ "product": session.context() })),
                )?;
                self.chat = Some(session);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn send_chat(&mut self, text: &str) -> Result<()> {
        let turn = match self.chat.as_mut().and_then(|session| session.send(text)) {
            Some(turn) => turn,
            None => return Ok(()),
        };
        self.events.record(
            "chat_turn",
            payload(json!({ "product": turn.product, "chars": turn.message.chars().count() })),
        )?;
        let outcome = self.gateway.chat(&turn.message, &turn.product);
        match outcome {
            Ok(reply) => {
                self.events.record(
                    "chat_reply",
                    payload(json!({ "detected_intent": reply.detected_intent })),
                )?;
                if let Some(session) = self.chat.as_mut() {
                    session.on_reply(&reply.reply_text);
                }
            }
            Err(err) => {
                self.events.record(
                    "chat_reply_failed",
                    payload(json!({ "error": truncate_text(&err.to_string(), 256) })),
                )?;
                if let Some(session) = self.chat.as_mut() {
                    session.on_failure();
                }
            }
        }
        Ok(())
    }

    pub fn close_chat(&mut self) -> Result<()> {
        if self.chat.take().is_some() {
            self.events.record("chat_closed", EventPayload::new())?;
        }
        Ok(())
    }

    pub fn query_fit(&mut self, body_type: &str, product_id: u64) -> Result<()> {
        let query = match self.fit.begin(body_type, product_id) {
            Some(query) => query,
            None => return Ok(()),
        };
        self.events.record(
            "fit_query",
            payload(json!({ "body_type": query.body_type, "product_id": query.product_id })),
        )?;
        let outcome = self.gateway.fit_score(&query.body_type, query.product_id);
        self.events.record(
            if outcome.is_ok() {
                "fit_scored"
            } else {
                "fit_unavailable"
            },
            EventPayload::new(),
        )?;
        self.fit.complete(outcome);
        Ok(())
    }

    pub fn load_product(&mut self, id: u64) -> Result<()> {
        self.product_view.begin();
        self.events
            .record("product_fetch", payload(json!({ "product_id": id })))?;
        let outcome = self.gateway.product(id);
        self.product_view.complete(outcome);
        Ok(())
    }

    pub fn start_poller(&self, interval: Duration) -> AnalyticsPoller {
        AnalyticsPoller::start(Arc::clone(&self.gateway), interval)
    }

    fn record_submit(&self, kind: WorkflowKind) -> Result<()> {
        self.events
            .record("workflow_submitted", payload(json!({ "workflow": kind.as_str() })))?;
        Ok(())
    }

    fn record_outcome<T>(&self, kind: WorkflowKind, outcome: &GatewayResult<T>) -> Result<()> {
        match outcome {
            Ok(_) => self.events.record(
                "workflow_succeeded",
                payload(json!({ "workflow": kind.as_str() })),
            )?,
            Err(err) => self.events.record(
                "workflow_failed",
                payload(json!({
                    "workflow": kind.as_str(),
                    "error": truncate_text(&err.to_string(), 256),
                })),
            )?,
        };
        Ok(())
    }
}

fn payload(value: Value) -> EventPayload {
    value.as_object().cloned().unwrap_or_default()
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
