//! The per-case accumulator and its write handle.
//!
//! A `CaseExecutionSession` is shared (`Arc`) between the orchestrator, the
//! panel, and any reader that looks the case up in the registry. Shared
//! holders can read everything and append agent messages. Everything else
//! (advancing the round, recording traces and therefore cost, charging the
//! physician visit, concluding) requires the `SessionWriter`, which
//! `CaseExecutionSession::open` hands out exactly once and which cannot be
//! cloned.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use dxpanel_contracts::{
    action::{ActionType, ExecutionMode},
    trace::{AgentMessage, AgentRole, ExecutionTrace, SessionSummary},
};

// ── Internal mutable state ────────────────────────────────────────────────────

/// The mutable interior of a `CaseExecutionSession`.
///
/// One lock guards all of it, so a reader never sees a trace whose cost has
/// not reached `total_cost` yet (or the reverse).
pub(crate) struct SessionState {
    pub(crate) current_round: u32,
    pub(crate) total_cost: f64,
    pub(crate) final_diagnosis: Option<String>,
    pub(crate) confidence_score: Option<f64>,
    pub(crate) traces: Vec<ExecutionTrace>,
    pub(crate) agent_messages: Vec<AgentMessage>,
    pub(crate) visit_charged: bool,
    pub(crate) concluded: bool,
}

// ── Shared session ────────────────────────────────────────────────────────────

/// Everything recorded about one case.
pub struct CaseExecutionSession {
    case_id: String,
    session_id: String,
    initial_case_info: String,
    created_at: DateTime<Utc>,
    mode: ExecutionMode,
    max_rounds: u32,
    budget_limit: Option<f64>,
    state: Mutex<SessionState>,
}

impl CaseExecutionSession {
    /// Open a new session and return it together with its only writer.
    ///
    /// `case_id` is used verbatim when given; otherwise a UUIDv4 is minted.
    /// The session id is always a fresh UUIDv4.
    pub fn open(
        case_id: Option<String>,
        initial_case_info: impl Into<String>,
        mode: ExecutionMode,
        max_rounds: u32,
        budget_limit: Option<f64>,
    ) -> (Arc<Self>, SessionWriter) {
        let session = Arc::new(Self {
            case_id: case_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            session_id: uuid::Uuid::new_v4().to_string(),
            initial_case_info: initial_case_info.into(),
            created_at: Utc::now(),
            mode,
            max_rounds,
            budget_limit,
            state: Mutex::new(SessionState {
                current_round: 0,
                total_cost: 0.0,
                final_diagnosis: None,
                confidence_score: None,
                traces: Vec::new(),
                agent_messages: Vec::new(),
                visit_charged: false,
                concluded: false,
            }),
        });
        let writer = SessionWriter { session: Arc::clone(&session) };
        (session, writer)
    }

    /// Lock the interior. A poisoned lock still holds consistent data: every
    /// critical section is a single append or field update.
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn case_id(&self) -> &str {
        &self.case_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn initial_case_info(&self) -> &str {
        &self.initial_case_info
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn budget_limit(&self) -> Option<f64> {
        self.budget_limit
    }

    pub fn current_round(&self) -> u32 {
        self.lock().current_round
    }

    pub fn total_cost(&self) -> f64 {
        self.lock().total_cost
    }

    pub fn final_diagnosis(&self) -> Option<String> {
        self.lock().final_diagnosis.clone()
    }

    pub fn confidence_score(&self) -> Option<f64> {
        self.lock().confidence_score
    }

    pub fn is_concluded(&self) -> bool {
        self.lock().concluded
    }

    /// Snapshot of the trace log.
    pub fn traces(&self) -> Vec<ExecutionTrace> {
        self.lock().traces.clone()
    }

    /// Snapshot of the agent message log.
    pub fn agent_messages(&self) -> Vec<AgentMessage> {
        self.lock().agent_messages.clone()
    }

    /// Append one agent message, stamped with the current round and time.
    ///
    /// This is the only mutation available through a shared reference.
    pub fn add_agent_message(
        &self,
        role: AgentRole,
        content: impl Into<String>,
        structured_data: Option<serde_json::Value>,
    ) {
        let mut state = self.lock();
        let message = AgentMessage {
            agent_role: role,
            round_number: state.current_round,
            timestamp: Utc::now(),
            message_type: role.message_type(),
            content: content.into(),
            structured_data,
        };
        state.agent_messages.push(message);
    }

    /// Point-in-time summary. Safe to call while the case is still running.
    pub fn summary(&self) -> SessionSummary {
        let state = self.lock();
        SessionSummary {
            case_id: self.case_id.clone(),
            session_id: self.session_id.clone(),
            final_diagnosis: state.final_diagnosis.clone(),
            confidence_score: state.confidence_score,
            total_cost: state.total_cost,
            rounds_completed: state.current_round,
            created_at: self.created_at,
            trace_count: state.traces.len(),
            agent_message_count: state.agent_messages.len(),
        }
    }
}

impl std::fmt::Debug for CaseExecutionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("CaseExecutionSession")
            .field("case_id", &self.case_id)
            .field("session_id", &self.session_id)
            .field("mode", &self.mode)
            .field("current_round", &state.current_round)
            .field("total_cost", &state.total_cost)
            .field("concluded", &state.concluded)
            .finish()
    }
}

// ── Writer ────────────────────────────────────────────────────────────────────

/// Exclusive write handle for one session. Not `Clone`.
pub struct SessionWriter {
    session: Arc<CaseExecutionSession>,
}

impl SessionWriter {
    pub fn session(&self) -> &Arc<CaseExecutionSession> {
        &self.session
    }

    /// Advance to the next round and return its number (1-based).
    pub fn next_round(&mut self) -> u32 {
        let mut state = self.session.lock();
        state.current_round += 1;
        state.current_round
    }

    /// Append a trace for the current round.
    ///
    /// A positive `cost_impact` is added to the session total here and
    /// nowhere else. Negative or non-finite impacts are dropped (the trace is
    /// still written, without a cost). Returns false, and writes nothing,
    /// once the session has concluded.
    pub fn record_trace(
        &mut self,
        action_type: ActionType,
        actor: &str,
        content: impl Into<String>,
        structured_data: serde_json::Value,
        cost_impact: Option<f64>,
    ) -> bool {
        let mut state = self.session.lock();
        if state.concluded {
            warn!(
                case_id = %self.session.case_id,
                action = %action_type,
                "trace recorded after conclusion ignored"
            );
            return false;
        }

        let cost_impact = match cost_impact {
            Some(c) if c.is_finite() && c >= 0.0 => Some(c),
            Some(c) => {
                warn!(case_id = %self.session.case_id, cost = c, "invalid cost impact dropped");
                None
            }
            None => None,
        };

        if let Some(c) = cost_impact {
            state.total_cost += c;
        }

        let trace = ExecutionTrace {
            case_id: self.session.case_id.clone(),
            session_id: self.session.session_id.clone(),
            timestamp: Utc::now(),
            round_number: state.current_round,
            action_type,
            actor: actor.to_string(),
            content: content.into(),
            structured_data,
            cost_impact,
        };

        debug!(
            case_id = %trace.case_id,
            round = trace.round_number,
            action = %action_type,
            cost = cost_impact.unwrap_or(0.0),
            total_cost = state.total_cost,
            "trace recorded"
        );
        state.traces.push(trace);
        true
    }

    /// Return the physician-visit charge for this session: `visit_cost` the
    /// first time it is called, 0.0 on every later call.
    ///
    /// The charge itself still has to be carried by a trace's `cost_impact`.
    pub fn charge_physician_visit(&mut self, visit_cost: f64) -> f64 {
        let mut state = self.session.lock();
        if state.visit_charged {
            0.0
        } else {
            state.visit_charged = true;
            visit_cost
        }
    }

    /// Set the final diagnosis. Confidence is clamped into `[0, 1]`.
    pub fn conclude(&mut self, diagnosis: impl Into<String>, confidence: f64) {
        let mut state = self.session.lock();
        let confidence = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };
        state.final_diagnosis = Some(diagnosis.into());
        state.confidence_score = Some(confidence);
        state.concluded = true;
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
