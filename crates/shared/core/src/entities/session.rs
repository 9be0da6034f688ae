use serde::{Deserialize, Serialize};

use crate::values::{SessionId, Time};

/// A contiguous range of steps sharing one parameter set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub name: String,
    pub start_time: Time,
    pub iteration_steps: Time,
    pub with_order_placement: bool,
    pub with_order_execution: bool,
    pub with_print: bool,
    /// Upper bound on normal-frequency agents that submit per step
    pub max_normal_orders: usize,
    /// Upper bound on high-frequency agents that submit per step
    pub max_high_frequency_orders: usize,
    /// Probability of running the high-frequency pass at all
    pub high_frequency_submission_rate: f64,
}

impl Session {
    pub fn new(session_id: SessionId, name: impl Into<String>, start_time: Time) -> Self {
        Self {
            session_id,
            name: name.into(),
            start_time,
            iteration_steps: 0,
            with_order_placement: false,
            with_order_execution: false,
            with_print: true,
            max_normal_orders: 1,
            max_high_frequency_orders: 1,
            high_frequency_submission_rate: 1.0,
        }
    }

    /// Last step covered by this session
    pub fn end_time(&self) -> Time {
        self.start_time + self.iteration_steps - 1
    }

    /// First step of the session that follows
    pub fn next_start_time(&self) -> Time {
        self.start_time + self.iteration_steps
    }
}
