//! Classifies an observed client reaction into a [`Verdict`].
//!
//! The teacher has no analogue for this — it is a client, not a
//! conformance judge — so this module is grounded directly on RFC
//! 7540/7541's MUST/MUST NOT language and on the Go original's
//! `verifier` package
//! (`examples/original_source/verifier/cases/completion_verifiers.go`,
//! `hpack/6_1_indexed.go`), which name the expectation
//! (`expectConnectionError`, `expectSuccessfulRequest`) without actually
//! reading the wire. This version reads the wire: every `expect_*`
//! function here is driven by frames the case runner has already read
//! off the live connection.

use crate::types::ErrorType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(String),
    Inconclusive(String),
}

impl Verdict {
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Pass => 0,
            Verdict::Fail(_) => 1,
            Verdict::Inconclusive(_) => 2,
        }
    }
}

/// Logs a verdict at the level matching its severity before handing it
/// back to the case routine: `trace!` for a pass, `debug!` for an
/// inconclusive read, `error!` for a confirmed failure.
fn log_verdict(verdict: Verdict) -> Verdict {
    match &verdict {
        Verdict::Pass => log::trace!("verdict: pass"),
        Verdict::Inconclusive(msg) => log::debug!("verdict: inconclusive: {msg}"),
        Verdict::Fail(msg) => log::error!("verdict: fail: {msg}"),
    }
    verdict
}

/// What the case runner observed after emitting a stimulus, as far as
/// the verifier needs to know. Built incrementally by a case's receive
/// loop (a case may see zero, one, or several of these before a
/// deadline or EOF).
#[derive(Debug, Clone)]
pub enum Observed {
    Goaway {
        code: ErrorType,
    },
    RstStream {
        stream: u32,
        code: ErrorType,
    },
    PingAck {
        payload: [u8; 8],
    },
    SettingsAck,
    /// Any frame not relevant to the expectation at hand (e.g. normal
    /// traffic continuing after a stimulus that should be ignored).
    Other,
    ConnectionClosed,
}

/// Success iff a GOAWAY with the matching error code is observed, or the
/// connection is closed after the stimulus with no further unrelated
/// traffic. A non-matching GOAWAY code, or normal traffic continuing, is
/// a failure.
pub fn expect_connection_error(code: ErrorType, observed: &[Observed]) -> Verdict {
    log_verdict((|| {
        for event in observed {
            match event {
                Observed::Goaway { code: got } if *got == code => return Verdict::Pass,
                Observed::Goaway { code: got } => {
                    return Verdict::Fail(format!(
                        "expected connection error {code:?}, client sent GOAWAY {got:?}"
                    ))
                }
                Observed::ConnectionClosed => return Verdict::Pass,
                Observed::Other => {
                    return Verdict::Fail(
                        "client continued normal traffic instead of tearing down the connection"
                            .to_string(),
                    )
                }
                _ => {}
            }
        }
        Verdict::Inconclusive(format!(
            "no reaction observed before the deadline; expected connection error {code:?}"
        ))
    })())
}

/// Success iff an RST_STREAM on `stream` with the matching code arrives
/// and the connection stays open; a connection error is also an
/// acceptable, stricter reaction to a stream-scoped violation.
pub fn expect_stream_error(stream: u32, code: ErrorType, observed: &[Observed]) -> Verdict {
    log_verdict((|| {
        for event in observed {
            match event {
                Observed::RstStream { stream: s, code: got } if *s == stream && *got == code => {
                    return Verdict::Pass
                }
                Observed::RstStream { stream: s, code: got } if *s == stream => {
                    return Verdict::Fail(format!(
                        "expected RST_STREAM {code:?} on stream {stream}, got {got:?}"
                    ))
                }
                Observed::Goaway { code: got } => {
                    return if *got == code {
                        Verdict::Pass
                    } else {
                        Verdict::Fail(format!(
                            "expected stream error {code:?}, client sent connection error {got:?}"
                        ))
                    }
                }
                Observed::ConnectionClosed => return Verdict::Pass,
                _ => {}
            }
        }
        Verdict::Inconclusive(format!(
            "no reaction observed before the deadline; expected stream error {code:?} on stream {stream}"
        ))
    })())
}

/// Success iff the client goes on responding normally to a follow-up
/// stimulus — the standard way to confirm a MUST-ignore reaction
/// actually happened instead of the client having silently died.
pub fn expect_ignored(observed: &[Observed]) -> Verdict {
    log_verdict((|| {
        for event in observed {
            match event {
                Observed::PingAck { .. } | Observed::SettingsAck | Observed::Other => {
                    return Verdict::Pass
                }
                Observed::Goaway { code } => {
                    return Verdict::Fail(format!(
                        "expected the client to ignore the stimulus, but it sent GOAWAY {code:?}"
                    ))
                }
                Observed::ConnectionClosed => {
                    return Verdict::Fail(
                        "expected the client to ignore the stimulus, but it closed the connection"
                            .to_string(),
                    )
                }
                Observed::RstStream { code, .. } => {
                    return Verdict::Fail(format!(
                        "expected the client to ignore the stimulus, but it sent RST_STREAM {code:?}"
                    ))
                }
            }
        }
        Verdict::Inconclusive(
            "no follow-up reply observed before the deadline; cannot confirm the stimulus was ignored"
                .to_string(),
        )
    })())
}

/// Success iff the client echoes a matching PING ACK for the given
/// opaque payload.
pub fn expect_ping_echo(sent_payload: [u8; 8], observed: &[Observed]) -> Verdict {
    log_verdict((|| {
        for event in observed {
            match event {
                Observed::PingAck { payload } if *payload == sent_payload => return Verdict::Pass,
                Observed::PingAck { payload } => {
                    return Verdict::Fail(format!(
                        "PING ACK payload mismatch: sent {sent_payload:?}, got {payload:?}"
                    ))
                }
                Observed::ConnectionClosed => {
                    return Verdict::Fail("connection closed before echoing the PING".to_string())
                }
                _ => {}
            }
        }
        Verdict::Inconclusive("no PING ACK observed before the deadline".to_string())
    })())
}

/// Success iff the client echoes a SETTINGS ACK.
pub fn expect_settings_ack(observed: &[Observed]) -> Verdict {
    log_verdict((|| {
        for event in observed {
            match event {
                Observed::SettingsAck => return Verdict::Pass,
                Observed::ConnectionClosed => {
                    return Verdict::Fail("connection closed before acknowledging SETTINGS".to_string())
                }
                _ => {}
            }
        }
        Verdict::Inconclusive("no SETTINGS ACK observed before the deadline".to_string())
    })())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_error_passes_on_matching_goaway() {
        let observed = vec![Observed::Goaway {
            code: ErrorType::FrameSizeError,
        }];
        assert_eq!(
            expect_connection_error(ErrorType::FrameSizeError, &observed),
            Verdict::Pass
        );
    }

    #[test]
    fn connection_error_fails_on_mismatched_code() {
        let observed = vec![Observed::Goaway {
            code: ErrorType::ProtocolError,
        }];
        assert!(matches!(
            expect_connection_error(ErrorType::FrameSizeError, &observed),
            Verdict::Fail(_)
        ));
    }

    #[test]
    fn connection_error_passes_on_bare_close() {
        let observed = vec![Observed::ConnectionClosed];
        assert_eq!(
            expect_connection_error(ErrorType::ProtocolError, &observed),
            Verdict::Pass
        );
    }

    #[test]
    fn connection_error_is_inconclusive_with_no_reaction() {
        assert!(matches!(
            expect_connection_error(ErrorType::ProtocolError, &[]),
            Verdict::Inconclusive(_)
        ));
    }

    #[test]
    fn ignored_passes_on_ping_ack() {
        let observed = vec![Observed::PingAck {
            payload: [0; 8],
        }];
        assert_eq!(expect_ignored(&observed), Verdict::Pass);
    }

    #[test]
    fn ignored_fails_if_client_tears_down() {
        let observed = vec![Observed::ConnectionClosed];
        assert!(matches!(expect_ignored(&observed), Verdict::Fail(_)));
    }

    #[test]
    fn ping_echo_matches_payload() {
        let observed = vec![Observed::PingAck { payload: *b"h2spec\0\0" }];
        assert_eq!(
            expect_ping_echo(*b"h2spec\0\0", &observed),
            Verdict::Pass
        );
    }
}
