//! FFI use-case API for Flutter-facing board calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level board functions to Dart via FRB.
//! - Hold the single mounted board and the session read cache.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Board state is only touched under the state lock; the lock is never
//!   held across a storage write.
//! - Ids cross the boundary as UUID strings, stages as `backlog|next|...`.
//! - Tickets are scoped to one mounted board; a storage result is only
//!   reconciled against the board that issued its ticket.
//! - Unmounting a board reports every move that never reached storage and
//!   drops cached items that include unsaved moves.

use log::{info, warn};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use taskboard_core::db::open_db;
use taskboard_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, parse_stage,
    ping as ping_inner, BoardConfig, BoardEvent, BoardSession, BoardStore, CacheKey,
    CancelReason, Completion, DragConfig, DragOutcome, DropTarget, FailureDecision, Item,
    ItemCache, MoveTicket, OrderModel, Point, PointerEvent, ReassignRequest, SqliteBoardStore,
    StoreResult, WorkAreaId,
};
use uuid::Uuid;

const BOARD_DB_FILE_NAME: &str = "taskboard.sqlite3";
static BOARD_DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static BOARD_STATE: OnceLock<Mutex<BoardState>> = OnceLock::new();

/// Process-wide board state behind the FFI.
#[derive(Default)]
struct BoardState {
    session: Option<BoardSession>,
    cache: ItemCache,
    /// Bumped on every mount and unmount.
    generation: u64,
    /// Requests of the mounted board applied locally and not yet handed to
    /// storage.
    outbox: BTreeMap<MoveTicket, ReassignRequest>,
}

impl BoardState {
    /// Mounted board identity a storage write is tied to.
    fn begin_write(&mut self, ticket: MoveTicket) -> Option<PendingWrite> {
        let work_area = self.session.as_ref()?.work_area();
        let request = self.outbox.remove(&ticket)?;
        Some(PendingWrite {
            generation: self.generation,
            work_area,
            request,
        })
    }

    /// Drops the mounted board, if any.
    ///
    /// Unsent and parked moves are returned as discarded. Cached items of the
    /// work area are invalidated while any move is still unconfirmed, so the
    /// next open reads storage.
    fn unmount(&mut self) -> Option<Unmounted> {
        let session = self.session.take()?;
        self.generation += 1;
        let unsent = std::mem::take(&mut self.outbox);
        let coordinator = session.coordinator();
        let work_area = session.work_area();

        let in_flight = coordinator.in_flight_count();
        if in_flight > 0 {
            self.cache.invalidate(&CacheKey::items(work_area));
        }
        let mut discarded = unsent.keys().copied().collect::<Vec<_>>();
        discarded.extend(
            coordinator
                .pending_failures()
                .into_iter()
                .map(|failure| failure.ticket),
        );
        discarded.sort_unstable();
        let saving = in_flight.saturating_sub(unsent.len());

        for ticket in &discarded {
            warn!(
                "event=ffi_unmount module=ffi status=discarded work_area={work_area} ticket={ticket}"
            );
        }
        info!(
            "event=ffi_unmount module=ffi status=ok work_area={work_area} discarded={} saving={saving}",
            discarded.len()
        );
        Some(Unmounted { discarded, saving })
    }
}

/// Storage write taken out of the outbox, stamped with its board.
struct PendingWrite {
    generation: u64,
    work_area: WorkAreaId,
    request: ReassignRequest,
}

/// What was left unsaved when a board was unmounted.
struct Unmounted {
    discarded: Vec<MoveTicket>,
    /// Writes already handed to storage; their results are not reconciled.
    saving: usize,
}

impl Unmounted {
    fn note(&self) -> Option<String> {
        match (self.discarded.len(), self.saving) {
            (0, 0) => None,
            (discarded, 0) => Some(format!("{discarded} unsaved move(s) discarded.")),
            (0, saving) => Some(format!("{saving} move(s) still saving; refresh to see them.")),
            (discarded, saving) => Some(format!(
                "{discarded} unsaved move(s) discarded; {saving} move(s) still saving."
            )),
        }
    }
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Pins the board database file for this process.
///
/// Must run before the first board call; afterwards the path is fixed.
/// Returns empty string on success and an error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_board_db(db_path: String) -> String {
    let trimmed = db_path.trim();
    if trimmed.is_empty() {
        return "db_path cannot be empty".to_string();
    }
    let requested = PathBuf::from(trimmed);
    let active = BOARD_DB_PATH.get_or_init(|| requested.clone());
    if *active == requested {
        String::new()
    } else {
        format!(
            "board DB already configured at `{}`; refusing to switch to `{}`",
            active.display(),
            requested.display()
        )
    }
}

/// One card as the UI renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardItemView {
    pub item_id: String,
    /// Stage id (`backlog|next|in_progress|review|done`).
    pub stage: String,
    pub rank: i64,
    pub title: String,
    pub priority: Option<String>,
}

/// Response envelope shared by board calls.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardResponse {
    /// Whether the call was accepted.
    pub ok: bool,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
    /// Current board, ordered by stage then rank. Empty on failure.
    pub items: Vec<BoardItemView>,
    /// Ticket of a locally applied move the host must pass to `board_persist`.
    pub pending_ticket: Option<u64>,
    /// Item whose detail view should open (click without drag).
    pub open_item_id: Option<String>,
}

impl BoardResponse {
    fn success(message: impl Into<String>, session: &BoardSession) -> Self {
        Self {
            ok: true,
            message: message.into(),
            items: board_items(session.items()),
            pending_ticket: None,
            open_item_id: None,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            items: Vec::new(),
            pending_ticket: None,
            open_item_id: None,
        }
    }
}

/// Result of unmounting the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardCloseResponse {
    /// Whether a board was mounted.
    pub closed: bool,
    pub message: String,
    /// Moves shown locally that were never stored, in ticket order.
    pub discarded_tickets: Vec<u64>,
}

/// Rolled-back move waiting for a retry or cancel decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardFailureView {
    pub ticket: u64,
    pub item_id: String,
    pub message: String,
    /// Storage was busy; offer retry as the default action.
    pub transient: bool,
}

/// Opens a work area's board, reading through the session cache.
///
/// # FFI contract
/// - Sync call, DB-backed only on a cache miss.
/// - Replaces any previously mounted board; its unsaved moves are discarded
///   and reported in `message`.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn board_open(work_area_id: String, drag_threshold_px: Option<f64>) -> BoardResponse {
    let work_area = match parse_uuid(&work_area_id, "work_area_id") {
        Ok(value) => value,
        Err(message) => return BoardResponse::failure(message),
    };
    let mut config = BoardConfig::default();
    if let Some(threshold_px) = drag_threshold_px.filter(|px| px.is_finite() && *px >= 0.0) {
        config.drag = DragConfig { threshold_px };
    }

    let conn = match open_db(resolve_board_db_path()) {
        Ok(conn) => conn,
        Err(err) => return BoardResponse::failure(format!("board_open failed: {err}")),
    };
    let store = match SqliteBoardStore::try_new(&conn) {
        Ok(store) => store,
        Err(err) => return BoardResponse::failure(format!("board_open failed: {err}")),
    };

    let mut state = lock_state();
    let state = &mut *state;
    let note = state.unmount().and_then(|unmounted| unmounted.note());
    match BoardSession::open(work_area, &store, &mut state.cache, config) {
        Ok(session) => {
            let message = match note {
                Some(note) => format!("Board opened. Previous board: {note}"),
                None => "Board opened.".to_string(),
            };
            let response = BoardResponse::success(message, &session);
            state.session = Some(session);
            state.generation += 1;
            response
        }
        Err(err) => BoardResponse::failure(format!("board_open failed: {err}")),
    }
}

/// Unmounts the current board.
///
/// Cached items stay for the next open unless they include unconfirmed
/// moves. Moves that never reached storage come back in
/// `discarded_tickets`.
#[flutter_rust_bridge::frb(sync)]
pub fn board_close() -> BoardCloseResponse {
    match lock_state().unmount() {
        Some(unmounted) => BoardCloseResponse {
            closed: true,
            message: unmounted
                .note()
                .unwrap_or_else(|| "Board closed.".to_string()),
            discarded_tickets: unmounted.discarded,
        },
        None => BoardCloseResponse {
            closed: false,
            message: "no board is open".to_string(),
            discarded_tickets: Vec::new(),
        },
    }
}

/// Pointer pressed on a card.
#[flutter_rust_bridge::frb(sync)]
pub fn board_pointer_down(item_id: String, x: f64, y: f64) -> BoardResponse {
    let item_id = match parse_uuid(&item_id, "item_id") {
        Ok(value) => value,
        Err(message) => return BoardResponse::failure(message),
    };
    with_session(|session, cache| {
        let origin = session
            .coordinator()
            .order_model()
            .placement_of(item_id)
            .ok_or_else(|| format!("item not on board: {item_id}"))?;
        let event = PointerEvent::Down {
            item_id,
            origin,
            at: Point::new(x, y),
        };
        Ok(session.handle_pointer(event, cache))
    })
}

/// Pointer moved. At most one of `hover_stage` / `hover_item_id` is set.
#[flutter_rust_bridge::frb(sync)]
pub fn board_pointer_move(
    x: f64,
    y: f64,
    hover_stage: Option<String>,
    hover_item_id: Option<String>,
) -> BoardResponse {
    let hover = match parse_target(hover_stage, hover_item_id) {
        Ok(value) => value,
        Err(message) => return BoardResponse::failure(message),
    };
    with_session(|session, cache| {
        let event = PointerEvent::Move {
            at: Point::new(x, y),
            hover,
        };
        Ok(session.handle_pointer(event, cache))
    })
}

/// Pointer released. A completed drop comes back with `pending_ticket`.
#[flutter_rust_bridge::frb(sync)]
pub fn board_pointer_up() -> BoardResponse {
    with_session(|session, cache| Ok(session.handle_pointer(PointerEvent::Up, cache)))
}

/// Gesture aborted by escape (`lost_capture=false`) or capture loss.
#[flutter_rust_bridge::frb(sync)]
pub fn board_pointer_cancel(lost_capture: bool) -> BoardResponse {
    let reason = if lost_capture {
        CancelReason::LostCapture
    } else {
        CancelReason::Escape
    };
    with_session(|session, cache| {
        Ok(session.handle_pointer(PointerEvent::Cancel { reason }, cache))
    })
}

/// Moves an item without a pointer gesture (keyboard, context menu).
#[flutter_rust_bridge::frb(sync)]
pub fn board_move_item(
    item_id: String,
    target_stage: Option<String>,
    target_item_id: Option<String>,
) -> BoardResponse {
    let item_id = match parse_uuid(&item_id, "item_id") {
        Ok(value) => value,
        Err(message) => return BoardResponse::failure(message),
    };
    let target = match parse_target(target_stage, target_item_id) {
        Ok(Some(target)) => target,
        Ok(None) => return BoardResponse::failure("a target stage or item is required"),
        Err(message) => return BoardResponse::failure(message),
    };
    with_session(|session, cache| Ok(session.drop_item(item_id, target, cache)))
}

/// Writes one locally applied move to storage and reconciles the result.
///
/// # FFI contract
/// - Async call; the state lock is released while the DB write runs.
/// - `ok=false` with the rolled-back board when storage rejects the move.
/// - `ok=false` without items when the issuing board was unmounted meanwhile.
/// - Never panics.
pub fn board_persist(ticket: u64) -> BoardResponse {
    let Some(pending) = lock_state().begin_write(ticket) else {
        return BoardResponse::failure(format!("no pending move for ticket {ticket}"));
    };
    let result = write_request(&pending.request);
    finish_write(pending, result)
}

fn write_request(request: &ReassignRequest) -> StoreResult<()> {
    let conn = open_db(resolve_board_db_path())?;
    let store = SqliteBoardStore::try_new(&conn)?;
    store.reassign(request)
}

fn finish_write(pending: PendingWrite, result: StoreResult<()>) -> BoardResponse {
    let ticket = pending.request.ticket;
    let mut state = lock_state();
    let state = &mut *state;
    let session = match state.session.as_mut() {
        Some(session) if state.generation == pending.generation => session,
        _ => {
            // The write may have landed after the next board loaded.
            state.cache.invalidate(&CacheKey::items(pending.work_area));
            warn!(
                "event=ffi_persist module=ffi status=orphaned ticket={ticket} item={} stored={}",
                pending.request.item_id,
                result.is_ok()
            );
            return BoardResponse::failure(match result {
                Ok(()) => "board was closed before the move was saved; refresh to see it"
                    .to_string(),
                Err(err) => format!("board was closed before the move failed: {err}"),
            });
        }
    };
    match session.complete(ticket, result, &mut state.cache) {
        Completion::Confirmed { .. } => BoardResponse::success("Move saved.", session),
        Completion::RolledBack(failure) => BoardResponse {
            ok: false,
            message: format!("Move failed and was undone: {}", failure.message),
            ..BoardResponse::success("", session)
        },
        Completion::Unknown(_) => {
            BoardResponse::failure(format!("ticket {ticket} is not in flight"))
        }
    }
}

/// Lists rolled-back moves in ticket order.
#[flutter_rust_bridge::frb(sync)]
pub fn board_pending_failures() -> Vec<BoardFailureView> {
    let state = lock_state();
    state
        .session
        .as_ref()
        .map(|session| {
            session
                .coordinator()
                .pending_failures()
                .into_iter()
                .map(|failure| BoardFailureView {
                    ticket: failure.ticket,
                    item_id: failure.item_id.to_string(),
                    message: failure.message,
                    transient: failure.transient,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Retries (`retry=true`) or cancels a rolled-back move.
///
/// A retry comes back with `pending_ticket` to persist again.
#[flutter_rust_bridge::frb(sync)]
pub fn board_resolve_failure(ticket: u64, retry: bool) -> BoardResponse {
    let decision = if retry {
        FailureDecision::Retry
    } else {
        FailureDecision::Cancel
    };
    let mut state = lock_state();
    let state = &mut *state;
    let Some(session) = state.session.as_mut() else {
        return BoardResponse::failure("no board is open");
    };
    match (session.resolve_failure(ticket, decision, &mut state.cache), decision) {
        (Some(request), _) => {
            let mut response = BoardResponse::success("Move re-applied.", session);
            response.pending_ticket = Some(request.ticket);
            state.outbox.insert(request.ticket, request);
            response
        }
        (None, FailureDecision::Cancel) => BoardResponse::success("Move discarded.", session),
        (None, FailureDecision::Retry) => {
            BoardResponse::failure(format!("ticket {ticket} cannot be retried"))
        }
    }
}

/// Reloads the mounted board from storage once nothing is in flight.
#[flutter_rust_bridge::frb(sync)]
pub fn board_refresh() -> BoardResponse {
    let conn = match open_db(resolve_board_db_path()) {
        Ok(conn) => conn,
        Err(err) => return BoardResponse::failure(format!("board_refresh failed: {err}")),
    };
    let store = match SqliteBoardStore::try_new(&conn) {
        Ok(store) => store,
        Err(err) => return BoardResponse::failure(format!("board_refresh failed: {err}")),
    };

    let mut state = lock_state();
    let state = &mut *state;
    let Some(session) = state.session.as_mut() else {
        return BoardResponse::failure("no board is open");
    };
    match session.refresh(&store, &mut state.cache) {
        Ok(true) => BoardResponse::success("Board refreshed.", session),
        Ok(false) => BoardResponse {
            ok: false,
            ..BoardResponse::success("Moves still saving; refresh skipped.", session)
        },
        Err(err) => BoardResponse::failure(format!("board_refresh failed: {err}")),
    }
}

fn with_session(
    f: impl FnOnce(&mut BoardSession, &mut ItemCache) -> Result<BoardEvent, String>,
) -> BoardResponse {
    let mut state = lock_state();
    let state = &mut *state;
    let Some(session) = state.session.as_mut() else {
        return BoardResponse::failure("no board is open");
    };
    let event = match f(session, &mut state.cache) {
        Ok(event) => event,
        Err(message) => return BoardResponse::failure(message),
    };

    match event {
        BoardEvent::MoveApplied(request) => {
            let mut response = BoardResponse::success("Move applied.", session);
            response.pending_ticket = Some(request.ticket);
            state.outbox.insert(request.ticket, request);
            response
        }
        BoardEvent::OpenItem(item_id) => {
            let mut response = BoardResponse::success("Open item.", session);
            response.open_item_id = Some(item_id.to_string());
            response
        }
        BoardEvent::NoChange => BoardResponse::success("Nothing to move.", session),
        BoardEvent::MoveRejected(err) => BoardResponse::failure(format!("move rejected: {err}")),
        BoardEvent::Gesture(outcome) => BoardResponse::success(gesture_label(&outcome), session),
    }
}

fn gesture_label(outcome: &DragOutcome) -> &'static str {
    match outcome {
        DragOutcome::Ignored => "ignored",
        DragOutcome::Armed { .. } => "armed",
        DragOutcome::DragStarted { .. } => "drag_started",
        DragOutcome::HoverChanged { .. } => "hover_changed",
        DragOutcome::Clicked { .. } => "clicked",
        DragOutcome::Dropped { .. } => "dropped",
        DragOutcome::DropIgnored { .. } => "drop_ignored",
        DragOutcome::Cancelled { .. } => "cancelled",
    }
}

fn lock_state() -> MutexGuard<'static, BoardState> {
    BOARD_STATE
        .get_or_init(|| Mutex::new(BoardState::default()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn resolve_board_db_path() -> PathBuf {
    BOARD_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("TASKBOARD_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(BOARD_DB_FILE_NAME)
        })
        .clone()
}

fn parse_uuid(value: &str, field: &str) -> Result<Uuid, String> {
    Uuid::parse_str(value.trim()).map_err(|_| format!("invalid {field}: `{value}`"))
}

fn parse_target(
    stage: Option<String>,
    item_id: Option<String>,
) -> Result<Option<DropTarget>, String> {
    match (stage, item_id) {
        (Some(_), Some(_)) => Err("give either a stage or an item target, not both".to_string()),
        (Some(stage), None) => parse_stage(&stage)
            .map(|stage| Some(DropTarget::Stage(stage)))
            .ok_or_else(|| format!("unknown stage `{stage}`")),
        (None, Some(item_id)) => {
            parse_uuid(&item_id, "item_id").map(|id| Some(DropTarget::Item(id)))
        }
        (None, None) => Ok(None),
    }
}

fn board_items(items: &[Item]) -> Vec<BoardItemView> {
    let model = OrderModel::new(items);
    OrderModel::all_stages()
        .iter()
        .flat_map(|stage| model.items_in_stage(*stage))
        .map(|item| BoardItemView {
            item_id: item.id.to_string(),
            stage: item.stage.as_str().to_string(),
            rank: item.rank,
            title: item.title.clone(),
            priority: item.priority.map(|priority| priority.as_str().to_string()),
        })
        .collect()
}
