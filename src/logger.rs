use std::fmt;

/// Sink for request and error logging performed by the [`Client`](crate::Client)
///
/// Implement this to integrate with a logging setup other than `tracing`.
/// Messages may mention endpoints and response bodies but never credentials.
pub trait RequestLogger: Send + Sync {
    fn error(&self, args: fmt::Arguments<'_>);
    fn warn(&self, args: fmt::Arguments<'_>);
    fn debug(&self, args: fmt::Arguments<'_>);
}

/// Discards all messages. This is the default logger.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl RequestLogger for NoopLogger {
    fn error(&self, _args: fmt::Arguments<'_>) {}
    fn warn(&self, _args: fmt::Arguments<'_>) {}
    fn debug(&self, _args: fmt::Arguments<'_>) {}
}

/// Forwards messages to `tracing` under the `slack_manager_client` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl RequestLogger for TracingLogger {
    fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(target: "slack_manager_client", "{}", args);
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(target: "slack_manager_client", "{}", args);
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(target: "slack_manager_client", "{}", args);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every message with its level, for assertions in tests
    #[derive(Default)]
    pub(crate) struct RecordingLogger {
        pub(crate) lines: Mutex<Vec<(&'static str, String)>>,
    }

    impl RecordingLogger {
        pub(crate) fn count(&self, level: &str) -> usize {
            self.lines
                .lock()
                .unwrap()
                .iter()
                .filter(|(l, _)| *l == level)
                .count()
        }
    }

    impl RequestLogger for RecordingLogger {
        fn error(&self, args: fmt::Arguments<'_>) {
            self.lines.lock().unwrap().push(("error", args.to_string()));
        }

        fn warn(&self, args: fmt::Arguments<'_>) {
            self.lines.lock().unwrap().push(("warn", args.to_string()));
        }

        fn debug(&self, args: fmt::Arguments<'_>) {
            self.lines.lock().unwrap().push(("debug", args.to_string()));
        }
    }

    #[test]
    fn test_recording_logger_formats_arguments() {
        let logger = RecordingLogger::default();
        logger.warn(format_args!("retrying {} in {:?}", "GET", 5));
        logger.debug(format_args!("attempt {}", 1));
        assert_eq!(logger.count("warn"), 1);
        assert_eq!(logger.count("debug"), 1);
        assert_eq!(logger.lines.lock().unwrap()[0].1, "retrying GET in 5");
    }

    #[test]
    fn test_noop_and_tracing_loggers_accept_messages() {
        let loggers: [&dyn RequestLogger; 2] = [&NoopLogger, &TracingLogger];
        for logger in loggers {
            logger.error(format_args!("e {}", 1));
            logger.warn(format_args!("w {}", 2));
            logger.debug(format_args!("d {}", 3));
        }
    }
}
