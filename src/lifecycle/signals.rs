//! OS signal handling.
//!
//! # Responsibilities
//! - Name the signals an engine can be configured to listen for
//! - Register OS handlers and forward every delivery as an interrupt
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The default set is an immutable constant copied into each engine
//! - Non-Unix platforms only support `Interrupt` (Ctrl-C)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::lifecycle::error::ConfigError;

/// A process signal that triggers a graceful shutdown.
///
/// Configuration files accept the same names as `FromStr`, e.g. `"terminate"`,
/// `"SIGTERM"` or `"usr1"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Signal {
    /// SIGINT, or Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// SIGQUIT.
    Quit,
    /// SIGHUP.
    Hangup,
    /// SIGUSR1.
    User1,
    /// SIGUSR2.
    User2,
}

/// Signals an engine listens for unless configured otherwise.
pub const DEFAULT_SIGNALS: [Signal; 3] = [Signal::Interrupt, Signal::Terminate, Signal::Quit];

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Interrupt => "interrupt",
            Signal::Terminate => "terminate",
            Signal::Quit => "quit",
            Signal::Hangup => "hangup",
            Signal::User1 => "user1",
            Signal::User2 => "user2",
        }
    }

    #[cfg(unix)]
    fn kind(&self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;
        match self {
            Signal::Interrupt => SignalKind::interrupt(),
            Signal::Terminate => SignalKind::terminate(),
            Signal::Quit => SignalKind::quit(),
            Signal::Hangup => SignalKind::hangup(),
            Signal::User1 => SignalKind::user_defined1(),
            Signal::User2 => SignalKind::user_defined2(),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Signal {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().trim_start_matches("sig") {
            "int" | "interrupt" => Ok(Signal::Interrupt),
            "term" | "terminate" => Ok(Signal::Terminate),
            "quit" => Ok(Signal::Quit),
            "hup" | "hangup" => Ok(Signal::Hangup),
            "usr1" | "user1" => Ok(Signal::User1),
            "usr2" | "user2" => Ok(Signal::User2),
            _ => Err(ConfigError::UnknownSignal(s.to_string())),
        }
    }
}

impl TryFrom<String> for Signal {
    type Error = ConfigError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<Signal> for String {
    fn from(signal: Signal) -> Self {
        signal.as_str().to_string()
    }
}

/// Register a handler for every signal in `signals` and forward each delivery
/// to `tx`.
///
/// Forwarders live in the returned `JoinSet`; dropping it unregisters them.
/// A signal whose handler cannot be installed is logged and skipped.
pub fn forward_signals(signals: &[Signal], tx: mpsc::Sender<Signal>) -> JoinSet<()> {
    let mut forwarders = JoinSet::new();

    for &signal in signals {
        #[cfg(unix)]
        {
            let mut stream = match tokio::signal::unix::signal(signal.kind()) {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(signal = %signal, error = %e, "Failed to install signal handler");
                    continue;
                }
            };
            let tx = tx.clone();
            forwarders.spawn(async move {
                while stream.recv().await.is_some() {
                    if tx.send(signal).await.is_err() {
                        break;
                    }
                }
            });
        }

        #[cfg(not(unix))]
        {
            if signal != Signal::Interrupt {
                tracing::warn!(signal = %signal, "Signal not supported on this platform");
                continue;
            }
            let tx = tx.clone();
            forwarders.spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    if tx.send(signal).await.is_err() {
                        break;
                    }
                }
            });
        }
    }

    forwarders
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signal_names() {
        assert_eq!("interrupt".parse::<Signal>().unwrap(), Signal::Interrupt);
        assert_eq!("SIGTERM".parse::<Signal>().unwrap(), Signal::Terminate);
        assert_eq!("quit".parse::<Signal>().unwrap(), Signal::Quit);
        assert_eq!("sighup".parse::<Signal>().unwrap(), Signal::Hangup);
        assert_eq!("USR1".parse::<Signal>().unwrap(), Signal::User1);
        assert_eq!("user2".parse::<Signal>().unwrap(), Signal::User2);
        assert!(matches!(
            "sigkill".parse::<Signal>(),
            Err(ConfigError::UnknownSignal(_))
        ));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for signal in [Signal::Hangup, Signal::User1, Signal::Quit] {
            assert_eq!(signal.to_string().parse::<Signal>().unwrap(), signal);
        }
    }

    #[test]
    fn test_deserialize_accepts_aliases() {
        #[derive(Deserialize)]
        struct Signals {
            signals: Vec<Signal>,
        }

        let parsed: Signals = toml::from_str(r#"signals = ["sigterm", "usr1", "hangup"]"#).unwrap();
        assert_eq!(
            parsed.signals,
            vec![Signal::Terminate, Signal::User1, Signal::Hangup]
        );

        let err = toml::from_str::<Signals>(r#"signals = ["sigkill"]"#)
            .err()
            .unwrap();
        assert!(err.to_string().contains("unknown signal: sigkill"));
    }

    #[test]
    fn test_default_set() {
        assert_eq!(DEFAULT_SIGNALS.len(), 3);
        assert!(DEFAULT_SIGNALS.contains(&Signal::Interrupt));
        assert!(DEFAULT_SIGNALS.contains(&Signal::Terminate));
        assert!(DEFAULT_SIGNALS.contains(&Signal::Quit));
    }

    #[tokio::test]
    async fn test_forwarders_stop_with_join_set() {
        let (tx, _rx) = mpsc::channel(1);
        let forwarders = forward_signals(&[Signal::User2], tx);
        assert!(forwarders.len() <= 1);
        drop(forwarders);
    }
}
