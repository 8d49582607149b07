//! Transaction engine
//!
//! One transaction is: flush stale input, write the frame, read the reply in
//! the command's [`ReplyFormat`], then validate tag, terminator, length and
//! the command's own decode check. Timeouts and protocol errors are retried by
//! re-issuing the whole frame, `retry` times. When the budget is spent the
//! optional [`RecoveryHook`] runs once and the command gets one final attempt.

use std::fmt;

use rig_protocol::{ParseError, RigError};
use tracing::{debug, warn};

use crate::port::RigPort;

/// How a reply is delimited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFormat {
    /// Write-only command
    None,
    /// Read until a byte from `stopset`, at most `max_len` bytes
    Terminated {
        stopset: &'static [u8],
        max_len: usize,
    },
    /// Exactly `n` bytes
    Fixed(usize),
}

/// Length class a reply must satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthCheck {
    #[default]
    Any,
    Exact(usize),
    AtLeast(usize),
}

impl LengthCheck {
    fn check(&self, len: usize) -> Result<(), ParseError> {
        let expected = match *self {
            LengthCheck::Any => return Ok(()),
            LengthCheck::Exact(n) if len == n => return Ok(()),
            LengthCheck::AtLeast(n) if len >= n => return Ok(()),
            LengthCheck::Exact(n) | LengthCheck::AtLeast(n) => n,
        };
        Err(ParseError::UnexpectedLength {
            expected,
            actual: len,
        })
    }
}

/// Parses a reply far enough to prove it is well formed
pub type ReplyCheck = fn(&[u8]) -> Result<(), ParseError>;

/// A command frame and the shape of its reply
#[derive(Debug, Clone)]
pub struct Command {
    pub frame: Vec<u8>,
    pub reply: ReplyFormat,
    /// Prefix the reply must start with
    pub tag: Vec<u8>,
    pub length: LengthCheck,
    /// Exact reply meaning "command rejected"
    pub rejection: Option<&'static [u8]>,
    /// A terminated reply must end with a byte from the stopset
    pub require_terminator: bool,
    pub check: Option<ReplyCheck>,
}

impl Command {
    /// A command that expects no reply
    pub fn write_only(frame: Vec<u8>) -> Self {
        Self {
            frame,
            reply: ReplyFormat::None,
            tag: Vec::new(),
            length: LengthCheck::Any,
            rejection: None,
            require_terminator: false,
            check: None,
        }
    }

    /// A command whose reply ends with a byte from `stopset`
    pub fn terminated(frame: Vec<u8>, stopset: &'static [u8], max_len: usize) -> Self {
        Self {
            reply: ReplyFormat::Terminated { stopset, max_len },
            ..Self::write_only(frame)
        }
    }

    /// A command with a fixed-length reply
    pub fn fixed(frame: Vec<u8>, len: usize) -> Self {
        Self {
            reply: ReplyFormat::Fixed(len),
            length: LengthCheck::Exact(len),
            ..Self::write_only(frame)
        }
    }

    pub fn tag(mut self, tag: &[u8]) -> Self {
        self.tag = tag.to_vec();
        self
    }

    pub fn length(mut self, length: LengthCheck) -> Self {
        self.length = length;
        self
    }

    pub fn rejection(mut self, reply: &'static [u8]) -> Self {
        self.rejection = Some(reply);
        self
    }

    /// Treat a reply cut short by a quiet device as malformed
    pub fn require_terminator(mut self) -> Self {
        self.require_terminator = true;
        self
    }

    /// Run `check` on every reply before it is accepted
    pub fn check(mut self, check: ReplyCheck) -> Self {
        self.check = Some(check);
        self
    }

    /// Check a reply against the tag, rejection marker, terminator, length
    /// class and decode check
    pub fn validate(&self, reply: &[u8]) -> Result<(), RigError> {
        if self.rejection.is_some_and(|r| r == reply) {
            return Err(RigError::Rejected(
                String::from_utf8_lossy(&self.frame).trim_end().to_string(),
            ));
        }
        if !reply.starts_with(&self.tag) {
            let actual = reply[..reply.len().min(self.tag.len())].to_vec();
            return Err(ParseError::UnexpectedTag {
                expected: self.tag.clone(),
                actual,
            }
            .into());
        }
        if let ReplyFormat::Terminated { stopset, .. } = self.reply {
            if self.require_terminator && !reply.last().is_some_and(|b| stopset.contains(b)) {
                return Err(ParseError::InvalidFrame(format!(
                    "unterminated reply {:02X?}",
                    reply
                ))
                .into());
            }
        }
        self.length.check(reply.len())?;
        if let Some(check) = self.check {
            check(reply)?;
        }
        Ok(())
    }
}

/// Runs one exchange with no retry
pub fn exchange_once(port: &mut RigPort, command: &Command) -> Result<Vec<u8>, RigError> {
    port.flush()?;
    port.write_block(&command.frame)?;
    let reply = match command.reply {
        ReplyFormat::None => return Ok(Vec::new()),
        ReplyFormat::Terminated { stopset, max_len } => port.read_string(stopset, max_len)?,
        ReplyFormat::Fixed(n) => port.read_block(n)?,
    };
    command.validate(&reply)?;
    Ok(reply)
}

/// Strategy run once after the retry budget is spent
///
/// The failed command gets one more attempt afterwards whatever the hook
/// returns; an error is only logged.
pub trait RecoveryHook: Send {
    fn recover(&mut self, port: &mut RigPort) -> Result<(), RigError>;
}

impl<F> RecoveryHook for F
where
    F: FnMut(&mut RigPort) -> Result<(), RigError> + Send,
{
    fn recover(&mut self, port: &mut RigPort) -> Result<(), RigError> {
        self(port)
    }
}

/// Counters kept by the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Calls to [`TransactionEngine::execute`]
    pub transactions: u64,
    /// Exchanges re-issued after a retryable error
    pub retries: u64,
    /// Recovery hook invocations
    pub recoveries: u64,
    /// Transactions that returned an error
    pub failures: u64,
}

/// Retry and recovery policy around [`exchange_once`]
pub struct TransactionEngine {
    retry: u32,
    recovery: Option<Box<dyn RecoveryHook>>,
    stats: EngineStats,
}

impl fmt::Debug for TransactionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionEngine")
            .field("retry", &self.retry)
            .field("recovery", &self.recovery.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}

impl TransactionEngine {
    pub fn new(retry: u32) -> Self {
        Self {
            retry,
            recovery: None,
            stats: EngineStats::default(),
        }
    }

    pub fn with_recovery(mut self, hook: Box<dyn RecoveryHook>) -> Self {
        self.recovery = Some(hook);
        self
    }

    pub fn set_recovery(&mut self, hook: Option<Box<dyn RecoveryHook>>) {
        self.recovery = hook;
    }

    pub fn retry(&self) -> u32 {
        self.retry
    }

    pub fn set_retry(&mut self, retry: u32) {
        self.retry = retry;
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Run `command`, retrying and recovering as configured
    pub fn execute(&mut self, port: &mut RigPort, command: &Command) -> Result<Vec<u8>, RigError> {
        self.stats.transactions += 1;
        let result = self.run(port, command);
        if result.is_err() {
            self.stats.failures += 1;
        }
        result
    }

    fn run(&mut self, port: &mut RigPort, command: &Command) -> Result<Vec<u8>, RigError> {
        let mut last = RigError::Timeout;
        for attempt in 0..=self.retry {
            if attempt > 0 {
                self.stats.retries += 1;
                debug!("Retry {}/{} after: {}", attempt, self.retry, last);
            }
            match exchange_once(port, command) {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_retryable() => {
                    if let RigError::Protocol(ref msg) = e {
                        warn!("Failed to parse reply: {}", msg);
                    }
                    last = e;
                }
                Err(e) => return Err(e),
            }
        }

        let Some(hook) = self.recovery.as_mut() else {
            return Err(last);
        };
        self.stats.recoveries += 1;
        warn!(
            "No valid reply after {} attempts ({}), running recovery",
            self.retry + 1,
            last
        );
        if let Err(e) = hook.recover(port) {
            warn!("Recovery failed: {}", e);
        }
        exchange_once(port, command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::port::PortTiming;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn port(mock: MockTransport) -> RigPort {
        RigPort::new(
            Box::new(mock),
            PortTiming {
                timeout: Duration::from_millis(5),
                ..Default::default()
            },
        )
    }

    fn get_freq() -> Command {
        Command::terminated(b"FA;".to_vec(), b";", 64)
            .tag(b"FA")
            .length(LengthCheck::Exact(14))
            .rejection(b"?;")
    }

    #[test]
    fn test_length_check() {
        assert!(LengthCheck::Any.check(0).is_ok());
        assert!(LengthCheck::Exact(6).check(6).is_ok());
        assert!(LengthCheck::Exact(6).check(5).is_err());
        assert!(LengthCheck::AtLeast(3).check(9).is_ok());
        assert_eq!(
            LengthCheck::AtLeast(3).check(2),
            Err(ParseError::UnexpectedLength {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_validate_tag() {
        let cmd = get_freq();
        assert!(cmd.validate(b"FA00014074000;").is_ok());
        assert!(matches!(
            cmd.validate(b"FB00014074000;"),
            Err(RigError::Protocol(_))
        ));
        assert!(matches!(cmd.validate(b"?;"), Err(RigError::Rejected(_))));
    }

    #[test]
    fn test_execute_success() {
        let mut mock = MockTransport::new();
        mock.expect(b"FA;", b"FA00014074000;");
        let mut p = port(mock);
        let mut engine = TransactionEngine::new(3);
        let reply = engine.execute(&mut p, &get_freq()).unwrap();
        assert_eq!(reply, b"FA00014074000;".to_vec());
        assert_eq!(engine.stats().retries, 0);
    }

    #[test]
    fn test_retry_bound_on_silent_device() {
        let mock = MockTransport::silent();
        let handle = mock.handle();
        let mut p = port(mock);
        let mut engine = TransactionEngine::new(3);
        assert_eq!(engine.execute(&mut p, &get_freq()), Err(RigError::Timeout));
        assert_eq!(handle.write_count(), 4);
        assert_eq!(engine.stats().retries, 3);
        assert_eq!(engine.stats().failures, 1);
    }

    #[test]
    fn test_zero_retry_single_attempt() {
        let mock = MockTransport::silent();
        let handle = mock.handle();
        let mut p = port(mock);
        let mut engine = TransactionEngine::new(0);
        assert!(engine.execute(&mut p, &get_freq()).is_err());
        assert_eq!(handle.write_count(), 1);
    }

    #[test]
    fn test_mistagged_reply_is_retried() {
        let mut mock = MockTransport::new();
        mock.expect(b"FA;", b"FB00007000000;");
        mock.expect(b"FA;", b"FA00014074000;");
        let mut p = port(mock);
        let mut engine = TransactionEngine::new(1);
        let reply = engine.execute(&mut p, &get_freq()).unwrap();
        assert_eq!(reply, b"FA00014074000;".to_vec());
        assert_eq!(engine.stats().retries, 1);
    }

    #[test]
    fn test_mistag_exhausts_budget() {
        let mut mock = MockTransport::new();
        mock.expect(b"FA;", b"FB00007000000;");
        mock.expect(b"FA;", b"FB00007000000;");
        let mut p = port(mock);
        let mut engine = TransactionEngine::new(1);
        assert!(matches!(
            engine.execute(&mut p, &get_freq()),
            Err(RigError::Protocol(_))
        ));
    }

    #[test]
    fn test_rejection_not_retried() {
        let mut mock = MockTransport::new();
        mock.expect(b"FA;", b"?;");
        let handle = mock.handle();
        let mut p = port(mock);
        let mut engine = TransactionEngine::new(3);
        assert!(matches!(
            engine.execute(&mut p, &get_freq()),
            Err(RigError::Rejected(_))
        ));
        assert_eq!(handle.write_count(), 1);
    }

    #[test]
    fn test_write_only() {
        let mut mock = MockTransport::new();
        mock.expect_silence(b"TX;");
        let mut p = port(mock);
        let mut engine = TransactionEngine::new(3);
        let reply = engine
            .execute(&mut p, &Command::write_only(b"TX;".to_vec()))
            .unwrap();
        assert!(reply.is_empty());
    }

    #[test]
    fn test_recovery_grants_final_attempt() {
        let mut mock = MockTransport::new();
        mock.expect_silence(b"FA;");
        mock.expect_silence(b"FA;");
        let handle = mock.handle();
        let mut p = port(mock);

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let hook_handle = handle.clone();
        let mut engine = TransactionEngine::new(1).with_recovery(Box::new(
            move |_: &mut RigPort| -> Result<(), RigError> {
                seen.fetch_add(1, Ordering::SeqCst);
                hook_handle.expect(b"FA;", b"FA00014074000;");
                Ok(())
            },
        ));

        let reply = engine.execute(&mut p, &get_freq()).unwrap();
        assert_eq!(reply, b"FA00014074000;".to_vec());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.write_count(), 3);
        assert_eq!(engine.stats().recoveries, 1);
    }

    #[test]
    fn test_failed_recovery_still_makes_final_attempt() {
        let mock = MockTransport::silent();
        let handle = mock.handle();
        let mut p = port(mock);
        let mut engine = TransactionEngine::new(2).with_recovery(Box::new(
            |_: &mut RigPort| -> Result<(), RigError> { Err(RigError::Timeout) },
        ));
        assert_eq!(engine.execute(&mut p, &get_freq()), Err(RigError::Timeout));
        assert_eq!(handle.write_count(), 4);
        assert_eq!(engine.stats().recoveries, 1);
    }

    #[test]
    fn test_final_attempt_after_failed_recovery_can_succeed() {
        let mut mock = MockTransport::new();
        mock.expect_silence(b"FA;");
        mock.expect(b"FA;", b"FA00014074000;");
        let mut p = port(mock);
        let mut engine = TransactionEngine::new(0).with_recovery(Box::new(
            |_: &mut RigPort| -> Result<(), RigError> { Err(RigError::Timeout) },
        ));
        let reply = engine.execute(&mut p, &get_freq()).unwrap();
        assert_eq!(reply, b"FA00014074000;".to_vec());
    }

    fn digits_only(reply: &[u8]) -> Result<(), ParseError> {
        let body = &reply[2..reply.len() - 1];
        if body.iter().all(u8::is_ascii_digit) {
            Ok(())
        } else {
            Err(ParseError::InvalidDecimal(
                String::from_utf8_lossy(body).into_owned(),
            ))
        }
    }

    #[test]
    fn test_truncated_reply_is_retried() {
        let mut mock = MockTransport::new();
        mock.expect(b"FA;", b"FA000140");
        mock.expect(b"FA;", b"FA00014074000;");
        let handle = mock.handle();
        let mut p = port(mock);
        let mut engine = TransactionEngine::new(3);
        let cmd = Command::terminated(b"FA;".to_vec(), b";", 64)
            .tag(b"FA")
            .require_terminator();
        let reply = engine.execute(&mut p, &cmd).unwrap();
        assert_eq!(reply, b"FA00014074000;".to_vec());
        assert_eq!(handle.write_count(), 2);
        assert_eq!(engine.stats().retries, 1);
    }

    #[test]
    fn test_unterminated_reply_accepted_when_not_required() {
        let mut mock = MockTransport::new();
        mock.expect(b"?V\r", b"VER 1010");
        let mut p = port(mock);
        let mut engine = TransactionEngine::new(3);
        let cmd = Command::terminated(b"?V\r".to_vec(), b"\r", 32).tag(b"VER");
        assert_eq!(engine.execute(&mut p, &cmd).unwrap(), b"VER 1010".to_vec());
    }

    #[test]
    fn test_failed_decode_check_is_retried() {
        let mut mock = MockTransport::new();
        mock.expect(b"FA;", b"FA0001407X000;");
        mock.expect(b"FA;", b"FA00014074000;");
        let mut p = port(mock);
        let mut engine = TransactionEngine::new(1);
        let cmd = get_freq().check(digits_only);
        let reply = engine.execute(&mut p, &cmd).unwrap();
        assert_eq!(reply, b"FA00014074000;".to_vec());
        assert_eq!(engine.stats().retries, 1);
    }
}
