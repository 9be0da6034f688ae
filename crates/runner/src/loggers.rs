//! Log sinks shipped with the runner and the bus that feeds them

use std::io::{self, Write};
use std::sync::Arc;

use agora_core::{Log, MarketStepLog, Price};
use agora_ports::Logger;
use parking_lot::Mutex;

/// Records shared between a sink owned by the simulator and its reader
pub type SharedRecords<T> = Arc<Mutex<Vec<T>>>;

/// Buffers simulation records and hands them to every sink on flush
#[derive(Default)]
pub struct LogBus {
    pending: Vec<Log>,
    sinks: Vec<Box<dyn Logger>>,
}

impl LogBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&mut self, sink: Box<dyn Logger>) {
        self.sinks.push(sink);
    }

    pub fn has_sinks(&self) -> bool {
        !self.sinks.is_empty()
    }

    pub fn write(&mut self, log: impl Into<Log>) {
        if self.has_sinks() {
            self.pending.push(log.into());
        }
    }

    pub fn bulk_write<L: Into<Log>>(&mut self, logs: impl IntoIterator<Item = L>) {
        if self.has_sinks() {
            self.pending.extend(logs.into_iter().map(Into::into));
        }
    }

    /// Deliver pending records to the sinks in registration order
    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        for sink in self.sinks.iter_mut() {
            sink.process(&self.pending);
        }
        self.pending.clear();
    }

    /// Final flush, then let sinks close their outputs.
    ///
    /// Every sink is flushed; the first error reported is returned.
    pub fn close(&mut self) -> io::Result<()> {
        self.flush();
        let mut first = Ok(());
        for sink in self.sinks.iter_mut() {
            if let Err(e) = sink.flush() {
                if first.is_ok() {
                    first = Err(e);
                }
            }
        }
        first
    }
}

/// First I/O error a sink hit; later writes are skipped once it is set
#[derive(Debug, Default)]
struct SinkError(Option<io::Error>);

impl SinkError {
    fn is_set(&self) -> bool {
        self.0.is_some()
    }

    fn record(&mut self, sink: &str, result: io::Result<()>) {
        if let Err(e) = result {
            log::warn!("{} output failed, dropping further records: {}", sink, e);
            self.0.get_or_insert(e);
        }
    }

    /// Stored error if any, else the outcome of the final flush
    fn finish(&mut self, flushed: io::Result<()>) -> io::Result<()> {
        match self.0.take() {
            Some(e) => Err(e),
            None => flushed,
        }
    }
}

fn format_price(price: Option<Price>) -> String {
    match price {
        Some(price) => price.to_string(),
        None => "None".to_string(),
    }
}

/// Prints one line per market and step for sessions with `withPrint`
///
/// `session_id market_time market_id market_name market_price fundamental_price`
pub struct MarketStepPrintLogger {
    out: Box<dyn Write + Send>,
    error: SinkError,
}

impl MarketStepPrintLogger {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            error: SinkError::default(),
        }
    }
}

impl Default for MarketStepPrintLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for MarketStepPrintLogger {
    fn process_market_step_end_log(&mut self, log: &MarketStepLog) {
        if !log.with_print || self.error.is_set() {
            return;
        }
        let line = writeln!(
            self.out,
            "{} {} {} {} {} {}",
            log.session_id,
            log.market_time,
            log.market_id,
            log.market_name,
            format_price(log.market_price),
            format_price(log.fundamental_price)
        );
        self.error.record("market step print", line);
    }

    fn flush(&mut self) -> io::Result<()> {
        let flushed = self.out.flush();
        self.error.finish(flushed)
    }
}

/// Keeps every market-step-end snapshot
#[derive(Default)]
pub struct MarketStepSaver {
    records: SharedRecords<MarketStepLog>,
}

impl MarketStepSaver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the saved snapshots, readable after the run
    pub fn records(&self) -> SharedRecords<MarketStepLog> {
        Arc::clone(&self.records)
    }
}

impl Logger for MarketStepSaver {
    fn process_market_step_end_log(&mut self, log: &MarketStepLog) {
        self.records.lock().push(log.clone());
    }
}

/// Keeps every record
#[derive(Default)]
pub struct MemoryLogger {
    records: SharedRecords<Log>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> SharedRecords<Log> {
        Arc::clone(&self.records)
    }
}

impl Logger for MemoryLogger {
    fn process(&mut self, logs: &[Log]) {
        self.records.lock().extend_from_slice(logs);
    }
}

/// Writes every record as one JSON object per line
pub struct JsonLinesLogger<W: Write + Send> {
    out: W,
    error: SinkError,
}

impl<W: Write + Send> JsonLinesLogger<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            error: SinkError::default(),
        }
    }

    fn write_log(&mut self, log: &Log) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, log)?;
        self.out.write_all(b"\n")
    }
}

impl<W: Write + Send> Logger for JsonLinesLogger<W> {
    fn process(&mut self, logs: &[Log]) {
        for log in logs {
            if self.error.is_set() {
                return;
            }
            let written = self.write_log(log);
            self.error.record("json lines", written);
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let flushed = self.out.flush();
        self.error.finish(flushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::{ExecutionLog, SimulationEndLog};

    fn step(with_print: bool) -> MarketStepLog {
        MarketStepLog {
            session_id: 1,
            session_name: "main".to_string(),
            with_print,
            market_id: 0,
            market_name: "Market-0".to_string(),
            market_time: 7,
            market_price: Some(300.5),
            fundamental_price: None,
        }
    }

    /// Writer whose bytes stay readable after the logger takes ownership
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    #[test]
    fn test_bus_buffers_until_flush() {
        let memory = MemoryLogger::new();
        let records = memory.records();
        let mut bus = LogBus::new();
        bus.add_sink(Box::new(memory));

        bus.write(SimulationEndLog { final_time: 3 });
        assert!(records.lock().is_empty());
        bus.flush();
        assert_eq!(records.lock().len(), 1);
        bus.flush();
        assert_eq!(records.lock().len(), 1);
    }

    #[test]
    fn test_bus_without_sinks_keeps_nothing() {
        let mut bus = LogBus::new();
        bus.bulk_write(vec![Log::MarketStepEnd(step(true))]);
        bus.flush();
        assert!(!bus.has_sinks());
    }

    #[test]
    fn test_print_logger_format() {
        let buffer = SharedBuffer::default();
        let mut logger = MarketStepPrintLogger::with_writer(Box::new(buffer.clone()));
        logger.process(&[
            Log::MarketStepBegin(step(true)),
            Log::MarketStepEnd(step(true)),
            Log::MarketStepEnd(step(false)),
        ]);
        assert_eq!(buffer.text(), "1 7 0 Market-0 300.5 None\n");
    }

    #[test]
    fn test_saver_keeps_step_ends_only() {
        let mut saver = MarketStepSaver::new();
        let records = saver.records();
        saver.process(&[Log::MarketStepBegin(step(true)), Log::MarketStepEnd(step(false))]);
        assert_eq!(records.lock().len(), 1);
        assert_eq!(records.lock()[0].market_time, 7);
    }

    #[test]
    fn test_json_lines() {
        let buffer = SharedBuffer::default();
        let mut logger = JsonLinesLogger::new(buffer.clone());
        let execution = ExecutionLog {
            market_id: 0,
            time: 1,
            buy_agent_id: 0,
            sell_agent_id: 1,
            buy_order_id: 0,
            sell_order_id: 1,
            price: 100.0,
            volume: 3,
        };
        logger.process(&[Log::Execution(execution.clone()), Log::SimulationEnd(SimulationEndLog { final_time: 1 })]);

        let text = buffer.text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: Log = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed, Log::Execution(execution));
        assert!(lines[1].contains("\"type\":\"simulation_end\""));
    }

    /// Takes `budget` bytes, then fails every write
    struct ShortWriter {
        budget: usize,
        flushes: usize,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if buf.len() > self.budget {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "no space left"));
            }
            self.budget -= buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_json_lines_reports_first_write_error() {
        let mut logger = JsonLinesLogger::new(ShortWriter { budget: 0, flushes: 0 });
        let end = Log::SimulationEnd(SimulationEndLog { final_time: 1 });
        logger.process(&[end.clone(), end.clone()]);
        logger.process(&[end]);

        let error = logger.flush().unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::WriteZero);
        assert_eq!(logger.out.flushes, 1);
        assert!(logger.flush().is_ok());
    }

    #[test]
    fn test_print_logger_reports_write_error() {
        let mut logger = MarketStepPrintLogger::with_writer(Box::new(ShortWriter { budget: 4, flushes: 0 }));
        logger.process(&[Log::MarketStepEnd(step(true))]);
        assert_eq!(logger.flush().unwrap_err().kind(), io::ErrorKind::WriteZero);
    }

    #[test]
    fn test_bus_close_flushes_all_sinks_and_returns_error() {
        let memory = MemoryLogger::new();
        let records = memory.records();
        let mut bus = LogBus::new();
        bus.add_sink(Box::new(JsonLinesLogger::new(ShortWriter { budget: 0, flushes: 0 })));
        bus.add_sink(Box::new(memory));

        bus.write(SimulationEndLog { final_time: 3 });
        assert!(bus.close().is_err());
        assert_eq!(records.lock().len(), 1);

        let mut quiet = LogBus::new();
        quiet.add_sink(Box::new(MemoryLogger::new()));
        assert!(quiet.close().is_ok());
    }
}
