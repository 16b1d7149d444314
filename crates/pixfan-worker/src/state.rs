use std::fmt::{Display, Formatter, Result as FmtResult};

/// Progress of one notification record through the worker.
///
/// `Idle -> Fetching -> Deriving[0] -> Publishing[0] -> ... -> Done`, or
/// `Failed` from any step. Each record owns its own machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Fetching,
    Deriving { index: usize, width: u32 },
    Publishing { index: usize, width: u32 },
    Done,
    Failed,
}

impl WorkerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerState::Done | WorkerState::Failed)
    }
}

impl Display for WorkerState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            WorkerState::Idle => write!(f, "idle"),
            WorkerState::Fetching => write!(f, "fetching"),
            WorkerState::Deriving { index, width } => write!(f, "deriving[{}] ({}px)", index, width),
            WorkerState::Publishing { index, width } => {
                write!(f, "publishing[{}] ({}px)", index, width)
            }
            WorkerState::Done => write!(f, "done"),
            WorkerState::Failed => write!(f, "failed"),
        }
    }
}

/// State machine of a single record. Transitions are logged at debug.
#[derive(Debug)]
pub(crate) struct RecordRun<'a> {
    key: &'a str,
    state: WorkerState,
    history: Vec<WorkerState>,
}

impl<'a> RecordRun<'a> {
    pub(crate) fn new(key: &'a str) -> Self {
        Self {
            key,
            state: WorkerState::Idle,
            history: vec![WorkerState::Idle],
        }
    }

    pub(crate) fn state(&self) -> WorkerState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: WorkerState) {
        if self.state.is_terminal() {
            tracing::warn!(key = %self.key, from = %self.state, to = %next, "Ignoring transition out of terminal state");
            return;
        }
        tracing::debug!(key = %self.key, from = %self.state, to = %next, "Worker state transition");
        self.state = next;
        self.history.push(next);
    }

    pub(crate) fn into_history(self) -> Vec<WorkerState> {
        self.history
    }
}
