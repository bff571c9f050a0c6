use serde::Serialize;

/// Lifecycle state of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    Start,
    Validate,
    Build,
    Verify,
    Initialise,
    Execute,
    Finalise,
}

/// Where the run currently is.
///
/// Processes and executors read this to decide how to behave; only the model
/// orchestration writes it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    pub state: ModelState,
    pub current_year: u32,
    pub current_time_step: usize,
    /// Index of the initialisation phase being executed.
    pub phase: usize,
    pub start_year: u32,
    pub final_year: u32,
}

impl RunState {
    pub fn new(start_year: u32, final_year: u32) -> Self {
        Self {
            state: ModelState::Start,
            current_year: start_year,
            current_time_step: 0,
            phase: 0,
            start_year,
            final_year,
        }
    }

    #[inline]
    pub fn is_initialising(&self) -> bool {
        self.state == ModelState::Initialise
    }

    /// Position of `year` within the model years.
    #[inline]
    pub fn year_index(&self, year: u32) -> Option<usize> {
        if year < self.start_year || year > self.final_year {
            None
        } else {
            Some((year - self.start_year) as usize)
        }
    }

    pub fn year_count(&self) -> usize {
        (self.final_year - self.start_year + 1) as usize
    }
}
