// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tracing subscriber setup and the process panic hook.

use std::{panic, sync::Once};

use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info,tower_http=debug";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter. Calling this twice is harmless:
/// the second installation attempt is ignored.
pub fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(false),
            )
            .try_init(),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
}

/// Log every panic through tracing before the default hook runs.
///
/// Panics inside request handlers are also turned into 500 responses by the
/// router; this covers the rest of the process (startup, background tasks).
/// Installs at most once.
pub fn install_panic_hook() {
    static INSTALL: Once = Once::new();

    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let payload = info.payload();
            let message = payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("non-string panic payload");
            let location = info
                .location()
                .map(|l| format!("{}:{}", l.file(), l.line()))
                .unwrap_or_default();

            error!(panic = message, %location, "Unhandled panic");
            previous(info);
        }));
    });
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use tracing::subscriber::DefaultGuard;

    /// Shared buffer the capturing subscriber writes into.
    #[derive(Clone, Default)]
    pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Capture every event on the current thread until the guard drops.
    pub fn capture_logs() -> (DefaultGuard, CapturedLogs) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        (tracing::subscriber::set_default(subscriber), logs)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::capture_logs;
    use super::*;

    #[test]
    fn panic_hook_logs_message_and_location() {
        install_panic_hook();
        let (_guard, logs) = capture_logs();

        let result = panic::catch_unwind(|| panic!("startup went sideways"));
        assert!(result.is_err());

        let output = logs.contents();
        assert!(output.contains("Unhandled panic"), "{output}");
        assert!(output.contains("startup went sideways"), "{output}");
        assert!(output.contains("telemetry.rs"), "{output}");
    }

    #[test]
    fn install_is_idempotent() {
        install_panic_hook();
        install_panic_hook();
        let (_guard, logs) = capture_logs();

        let _ = panic::catch_unwind(|| panic!("{}", String::from("owned payload")));

        assert_eq!(logs.contents().matches("Unhandled panic").count(), 1);
    }
}
