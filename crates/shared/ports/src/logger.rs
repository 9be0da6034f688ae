use agora_core::{
    CancelLog, ExecutionLog, ExpirationLog, Log, MarketStepLog, OrderLog, SessionBeginLog,
    SessionEndLog, SimulationBeginLog, SimulationEndLog,
};

/// Port for simulation log sinks
///
/// Every callback defaults to a no-op so a sink only implements the records
/// it cares about. The driver buffers records and hands them over in batches
/// through [`Logger::process`].
pub trait Logger: Send {
    fn process_order_log(&mut self, _log: &OrderLog) {}

    fn process_cancel_log(&mut self, _log: &CancelLog) {}

    fn process_expiration_log(&mut self, _log: &ExpirationLog) {}

    fn process_execution_log(&mut self, _log: &ExecutionLog) {}

    fn process_simulation_begin_log(&mut self, _log: &SimulationBeginLog) {}

    fn process_simulation_end_log(&mut self, _log: &SimulationEndLog) {}

    fn process_session_begin_log(&mut self, _log: &SessionBeginLog) {}

    fn process_session_end_log(&mut self, _log: &SessionEndLog) {}

    fn process_market_step_begin_log(&mut self, _log: &MarketStepLog) {}

    fn process_market_step_end_log(&mut self, _log: &MarketStepLog) {}

    /// Dispatch a batch of records to the per-record callbacks, in order
    fn process(&mut self, logs: &[Log]) {
        for log in logs {
            match log {
                Log::Order(log) => self.process_order_log(log),
                Log::Cancel(log) => self.process_cancel_log(log),
                Log::Expiration(log) => self.process_expiration_log(log),
                Log::Execution(log) => self.process_execution_log(log),
                Log::SimulationBegin(log) => self.process_simulation_begin_log(log),
                Log::SimulationEnd(log) => self.process_simulation_end_log(log),
                Log::SessionBegin(log) => self.process_session_begin_log(log),
                Log::SessionEnd(log) => self.process_session_end_log(log),
                Log::MarketStepBegin(log) => self.process_market_step_begin_log(log),
                Log::MarketStepEnd(log) => self.process_market_step_end_log(log),
            }
        }
    }

    /// Called once after the final batch. Sinks writing to an output report
    /// the first I/O error they hit during the run here.
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
