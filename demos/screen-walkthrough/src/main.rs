//! Walk through an app's permission screen from the terminal
//!
//! ```text
//! screen-walkthrough --fixture grants.json --package com.example.notes --audit-log toggles.jsonl
//! > show
//! > off android.permission-group.PHONE
//! > mode android.permission.CAMERA ask
//! > pause
//! > history
//! > quit
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use appperm_api::{AppIdentity, OpId, OpMode};
use appperm_host::collab::{MemoryGrantStore, MemoryOpModeStore};
use appperm_host::tracing_support::{init_subscriber_with_config, TracingConfig, TracingFormat};
use appperm_host::{
    HostConfigBuilder, JournalAuditSink, Outcome, ScreenSession, SessionOptions,
    TerminalConfirmationHandler, TracingAuditSink,
};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "screen-walkthrough", about = "Drive a permission screen session")]
struct Cli {
    /// Grant fixture (JSON)
    #[arg(long, default_value = "grants.json")]
    fixture: PathBuf,

    /// Package to open
    #[arg(long, default_value = "com.example.notes")]
    package: String,

    #[arg(long, default_value_t = 10123)]
    uid: u32,

    /// Open the additional-permissions page
    #[arg(long)]
    additional: bool,

    /// Append toggle reports to this JSON-lines file
    #[arg(long)]
    audit_log: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_subscriber_with_config(TracingConfig {
        format: if cli.json_logs {
            TracingFormat::Json
        } else {
            TracingFormat::Compact
        },
        ..Default::default()
    })?;

    let grants = MemoryGrantStore::from_path(&cli.fixture)
        .with_context(|| format!("loading {}", cli.fixture.display()))?;
    tracing::info!(fixture = %cli.fixture.display(), apps = grants.len(), "Loaded grant fixture");
    let ops = MemoryOpModeStore::new()
        .strict(OpId(60))
        .default_for(OpId(60), OpMode::Ignored);

    let mut builder = HostConfigBuilder::new()
        .grants(grants)
        .ops(ops)
        .confirmations(Arc::new(TerminalConfirmationHandler::new()));
    let journal = cli
        .audit_log
        .as_ref()
        .map(|path| JournalAuditSink::new(path))
        .transpose()?;
    builder = match &journal {
        Some(journal) => builder.audit(Arc::new(journal.clone())),
        None => builder.audit(Arc::new(TracingAuditSink)),
    };
    let config = builder.build()?;

    let options = if cli.additional {
        SessionOptions::additional_page()
    } else {
        SessionOptions::primary()
    };
    let app = AppIdentity::new(cli.package, cli.uid);
    let mut session = ScreenSession::open(config, app, options)?;
    print_screen(&session)?;

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        let result = match words.as_slice() {
            [] => continue,
            ["quit" | "exit"] => break,
            ["show"] => print_screen(&session),
            ["refresh"] => session
                .refresh()
                .map_err(anyhow::Error::from)
                .and_then(|screen| print_json(&screen)),
            ["history"] => history(journal.as_ref()),
            ["pause"] => session
                .pause()
                .map(|count| println!("reported {count} group(s)"))
                .map_err(anyhow::Error::from),
            [switch @ ("on" | "off"), group] => toggle(&mut session, group, *switch == "on"),
            ["mode", permission, mode] => set_mode(&mut session, permission, mode),
            _ => {
                println!("commands: show | refresh | pause | history | on GROUP | off GROUP | mode PERMISSION MODE | quit");
                Ok(())
            }
        };
        if let Err(e) = result {
            println!("error: {e:#}");
        }
    }

    session.exit()?;
    Ok(())
}

fn toggle(session: &mut ScreenSession, group: &str, value: bool) -> Result<()> {
    match session.apply_toggle_interactive(group, value)? {
        Outcome::Applied => println!("applied"),
        Outcome::Declined => println!("kept"),
        Outcome::Blocked(reason) => println!("blocked: {reason:?}"),
        Outcome::DelegatedToSpecialFlow => println!("handed to the consent flow"),
        Outcome::ConfirmRequired(_) => bail!("confirmation left unanswered"),
    }
    Ok(())
}

fn set_mode(session: &mut ScreenSession, permission: &str, mode: &str) -> Result<()> {
    match mode {
        "on" | "off" => session.set_op_switch(permission, mode == "on")?,
        _ => session.set_op_mode(permission, mode.parse::<OpMode>()?)?,
    }
    print_screen(session)
}

fn history(journal: Option<&JournalAuditSink>) -> Result<()> {
    let Some(journal) = journal else {
        bail!("no journal; start with --audit-log");
    };
    for report in journal.read_reports()? {
        println!("{} {}: {:?}", report.timestamp, report.app, report.group_names());
    }
    Ok(())
}

fn print_screen(session: &ScreenSession) -> Result<()> {
    print_json(&session.screen())
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
