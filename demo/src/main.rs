//! Certa Event Certificate Reference Runtime: Demo CLI
//!
//! Runs one or all of the summit scenarios. Each scenario uses real Certa
//! components (eligibility rules, template generator, repository, audit
//! ledger, orchestrator) wired together with mock event data.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- lifecycle
//!   cargo run -p demo -- concurrent-issuance
//!   cargo run -p demo -- audit-outage
//!   cargo run -p demo -- expiry-reissue

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use certa_contracts::error::CertResult;
use certa_ref_event::scenarios::{audit_outage, concurrent_issuance, expiry_reissue, lifecycle};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Certa: event certificate lifecycle demo.
///
/// Each subcommand runs one or all of the summit scenarios, demonstrating
/// eligibility rules, duplicate prevention, revocation, reissue, and the
/// tamper-evident audit trail.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Certa event certificate reference runtime demo",
    long_about = "Runs Certa summit scenarios showing certificate issuance, validation,\n\
                  revocation, reissue, concurrency guarantees, and audit chain integrity."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all four summit scenarios in sequence.
    RunAll,
    /// Scenario 1: issue, duplicate, revoke, reissue, validate.
    Lifecycle,
    /// Scenario 2: racing issuance and revocation.
    ConcurrentIssuance,
    /// Scenario 3: certificate operations while the audit store is down.
    AuditOutage,
    /// Scenario 4: date-based expiry, reissue, and cancellation.
    ExpiryReissue,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::Lifecycle => lifecycle::run_scenario(),
        Command::ConcurrentIssuance => concurrent_issuance::run_scenario(),
        Command::AuditOutage => audit_outage::run_scenario(),
        Command::ExpiryReissue => expiry_reissue::run_scenario(),
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

fn run_all() -> CertResult<()> {
    lifecycle::run_scenario()?;
    concurrent_issuance::run_scenario()?;
    audit_outage::run_scenario()?;
    expiry_reissue::run_scenario()?;
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("Certa: Event Certificate Core");
    println!("Harbor Systems Summit 2026 Reference Demo");
    println!("=========================================");
    println!();
    println!("Certificate issuance pipeline per request:");
    println!("  [1] Caller checks the actor's capabilities (self-service, staff, admin)");
    println!("  [2] Requirement rules decide eligibility; no rule means no certificate");
    println!("  [3] At most one active certificate per (owner, type, activity)");
    println!("  [4] Hash, verification code, and HTML artifact are generated and stored");
    println!("  [5] The outcome is appended to a SHA-256 chained audit ledger");
    println!();
}
