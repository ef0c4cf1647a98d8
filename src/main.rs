//! CLI entry point and TLS listener bootstrap.
//!
//! Grounded on the Go original's `main.go` (flag parsing, cert bootstrap,
//! accept-one-connection-and-run-one-case) and on the teacher's
//! `src/main.rs` for the logging/CLI idiom — upgraded from the teacher's
//! `clap` 2.x builder API to the derive API, since the rest of the
//! ecosystem sampled (see `examples/plabayo-rama/rama-cli/src/main.rs`)
//! uses derive and this crate's CLI surface is bigger than a single
//! positional argument.

use anyhow::{Context, Result};
use clap::Parser;
use h2spec_harness::cert::{self, CertPaths};
use h2spec_harness::{cases, driver, socket::TlsSocket};
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// An adversarial HTTP/2 + HPACK conformance test harness for HTTP/2
/// clients.
#[derive(Debug, Parser)]
#[command(name = "h2spec-harness", version, about)]
struct Cli {
    /// The test case to run, e.g. `6.5/1` or `hpack/6.1/1`.
    #[arg(long = "test")]
    test: Option<String>,

    /// Print every registered case identifier, sorted, and exit.
    #[arg(long)]
    list: bool,

    /// Address to listen on for the client-under-test's TLS connection.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Per-case receive-loop deadline, in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = 2000)]
    timeout_ms: u64,

    /// Path to the server certificate (generated if absent).
    #[arg(long, default_value = "cert.pem")]
    cert: PathBuf,

    /// Path to the server private key (generated if absent).
    #[arg(long, default_value = "key.pem")]
    key: PathBuf,
}

fn print_registry() {
    println!("Available test cases:");
    for id in cases::registry().keys() {
        println!("  - {id}");
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if cli.list {
        print_registry();
        std::process::exit(0);
    }

    let Some(test_case) = cli.test.clone() else {
        eprintln!("Usage: h2spec-harness --test=<test_case_id>");
        eprintln!("Example: h2spec-harness --test=6.5/1");
        print_registry();
        std::process::exit(1);
    };

    if cases::lookup(&test_case).is_none() {
        eprintln!("Unknown test case: {test_case}");
        print_registry();
        std::process::exit(3);
    }

    match run(&cli, &test_case) {
        Ok(verdict) => {
            println!("{verdict:?}");
            std::process::exit(verdict.exit_code());
        }
        Err(e) => {
            log::error!("internal error: {e:#}");
            eprintln!("internal error: {e:#}");
            std::process::exit(3);
        }
    }
}

fn run(cli: &Cli, test_case: &str) -> Result<h2spec_harness::Verdict> {
    cert::ensure(CertPaths {
        cert: &cli.cert,
        key: &cli.key,
    })?;
    let (certs, key) = cert::load(CertPaths {
        cert: &cli.cert,
        key: &cli.key,
    })?;

    let mut server_config = rustls::ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("building TLS server config")?;
    server_config.alpn_protocols = vec![b"h2".to_vec()];
    let server_config = Arc::new(server_config);

    let listener = TcpListener::bind(&cli.bind)
        .with_context(|| format!("binding {}", cli.bind))?;
    log::info!(
        "listening on {} for test case '{}'",
        listener.local_addr()?,
        test_case
    );

    let (stream, peer) = listener.accept().context("accepting connection")?;
    log::debug!("accepted connection from {peer}");

    let tls_conn =
        rustls::ServerConnection::new(server_config).context("initializing TLS session")?;
    let mut socket = TlsSocket::new(tls_conn, stream);

    // A handshake-stage failure (bad preface, bad initial frame, a
    // transport hiccup) is a verdict of Fail, not an internal error —
    // exit code 3 is reserved for an unknown case id and genuine setup
    // failures (bind, bad cert), both handled above this point.
    match driver::run(&mut socket, test_case, Duration::from_millis(cli.timeout_ms)) {
        Ok(verdict) => Ok(verdict),
        Err(e) => Ok(h2spec_harness::Verdict::Fail(e.to_string())),
    }
}
