use crate::api::{AnalysisType, BackendClient, LoginRequest};
use crate::config::{self, Settings};
use crate::shared::paths::ClientPaths;
use crate::workflow::{
    self, InterruptResolver, ResolutionOutcome, StatusPoller, UiStatus, WorkflowState,
    WorkflowStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const WATCH_RENDER_MS: u64 = 250;

pub fn usage() -> String {
    [
        "Usage: opsdeck <command> [args]",
        "",
        "Commands:",
        "  login <email-or-username> <password>   authenticate against the backend",
        "  logout                                  end the current session",
        "  whoami                                  show the authenticated user",
        "  analyze <file> [--type <kind>]          upload a file and start analysis",
        "                                          kind: security|performance|quality",
        "  watch                                   poll the active job until it settles",
        "  status                                  print the stored workflow snapshot",
        "  approve                                 approve the pending interrupt",
        "  reject                                  reject the pending interrupt",
        "  reset                                   clear the stored workflow state",
        "  metrics                                 fetch the dashboard metrics",
        "  help                                    show this message",
    ]
    .join("\n")
}

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    let mut args = args.into_iter();
    let Some(command) = args.next() else {
        return Ok(usage());
    };
    let rest: Vec<String> = args.collect();

    match command.as_str() {
        "help" | "--help" | "-h" => Ok(usage()),
        "login" => handle_login(&rest),
        "logout" => handle_logout(&rest),
        "whoami" => handle_whoami(&rest),
        "analyze" => handle_analyze(&rest),
        "watch" => handle_watch(&rest),
        "status" => handle_status(&rest),
        "approve" => handle_resolve(&rest, true),
        "reject" => handle_resolve(&rest, false),
        "reset" => handle_reset(&rest),
        "metrics" => handle_metrics(&rest),
        other => Err(format!("unknown command `{other}`\n\n{}", usage())),
    }
}

pub fn parse_analyze_args(rest: &[String]) -> Result<(PathBuf, AnalysisType), String> {
    let mut file: Option<PathBuf> = None;
    let mut analysis_type = AnalysisType::Security;
    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--type" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--type requires a value".to_string())?;
                analysis_type = AnalysisType::parse(value)?;
            }
            other if file.is_none() => file = Some(PathBuf::from(other)),
            other => return Err(format!("unexpected argument `{other}`")),
        }
    }
    let file = file.ok_or_else(|| "analyze requires a file path".to_string())?;
    Ok((file, analysis_type))
}

pub fn render_status(state: &WorkflowState) -> String {
    let mut lines = Vec::new();
    lines.push(format!("status: {}", state.ui_status));
    lines.push(format!(
        "job: {}",
        state.job_id.as_deref().unwrap_or("(none)")
    ));
    if let Some(started_at) = &state.started_at {
        lines.push(format!("started: {started_at}"));
    }
    if let Some(completed_at) = &state.completed_at {
        lines.push(format!("completed: {completed_at}"));
    }
    if let Some(error) = &state.error {
        lines.push(format!("error: {error}"));
    }
    if !state.node_statuses.is_empty() {
        lines.push("nodes:".to_string());
        for (node_id, info) in &state.node_statuses {
            lines.push(format!("  {node_id}: {}", info.status));
        }
    }
    if let Some(payload) = &state.interrupt_payload {
        lines.push(format!(
            "interrupt: node {} ({} finding(s)); run `opsdeck approve` or `opsdeck reject`",
            payload.node_id,
            payload.findings.len()
        ));
        for finding in &payload.findings {
            let location = match (finding.line, finding.column) {
                (Some(line), Some(column)) => format!(" [{line}:{column}]"),
                (Some(line), None) => format!(" [{line}]"),
                _ => String::new(),
            };
            lines.push(format!(
                "  {} {}{location}: {}",
                finding.severity, finding.rule, finding.message
            ));
        }
    }
    lines.push(format!("logs: {} entries", state.logs.len()));
    lines.join("\n")
}

fn load_context() -> Result<(ClientPaths, Settings), String> {
    let root = config::default_state_root().map_err(|err| err.to_string())?;
    let paths = ClientPaths::new(root);
    let settings = config::load_settings(&paths).map_err(|err| err.to_string())?;
    Ok((paths, settings))
}

fn backend_client(settings: &Settings) -> BackendClient {
    BackendClient::new(settings.effective_base_url())
}

fn expect_no_args(rest: &[String], command: &str) -> Result<(), String> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(format!("`{command}` takes no arguments"))
    }
}

fn handle_login(rest: &[String]) -> Result<String, String> {
    let [identifier, password] = rest else {
        return Err("login requires <email-or-username> <password>".to_string());
    };
    let (_, settings) = load_context()?;
    let client = backend_client(&settings);
    let response = client
        .login(&LoginRequest::with_identifier(identifier, password.clone()))
        .map_err(|err| err.to_string())?;
    match response.user {
        Some(user) => Ok(format!("logged in as {} <{}>", user.username, user.email)),
        None => Ok("logged in".to_string()),
    }
}

fn handle_logout(rest: &[String]) -> Result<String, String> {
    expect_no_args(rest, "logout")?;
    let (_, settings) = load_context()?;
    backend_client(&settings)
        .logout()
        .map_err(|err| err.to_string())?;
    Ok("logged out".to_string())
}

fn handle_whoami(rest: &[String]) -> Result<String, String> {
    expect_no_args(rest, "whoami")?;
    let (_, settings) = load_context()?;
    let user = backend_client(&settings)
        .current_user()
        .map_err(|err| err.to_string())?;
    Ok(format!("{} <{}> (id {})", user.username, user.email, user.id))
}

fn handle_analyze(rest: &[String]) -> Result<String, String> {
    let (file, analysis_type) = parse_analyze_args(rest)?;
    let (paths, settings) = load_context()?;
    let client = backend_client(&settings);
    let store = WorkflowStore::open(paths.root());
    let thread_id = workflow::start_analysis(&store, &client, &file, analysis_type)
        .map_err(|err| err.to_string())?;
    Ok(format!(
        "analysis started: job {thread_id} ({analysis_type})\nrun `opsdeck watch` to follow it"
    ))
}

fn handle_watch(rest: &[String]) -> Result<String, String> {
    expect_no_args(rest, "watch")?;
    let (paths, settings) = load_context()?;
    let client = backend_client(&settings);
    let store = Arc::new(WorkflowStore::open(paths.root()));

    let snapshot = store.snapshot();
    if snapshot.job_id.is_none() {
        return Err("no active job; run `opsdeck analyze <file>` first".to_string());
    }
    if snapshot.ui_status != UiStatus::Running {
        return Ok(render_status(&snapshot));
    }

    let poller = StatusPoller::spawn(
        Arc::clone(&store),
        client,
        Duration::from_millis(settings.polling.status_interval_ms),
    )
    .map_err(|err| err.to_string())?;

    let mut printed_logs = 0usize;
    let final_snapshot = loop {
        let snapshot = store.snapshot();
        for entry in snapshot.logs.iter().skip(printed_logs) {
            match &entry.node {
                Some(node) => println!("[{}] {} {}", entry.level, node, entry.message),
                None => println!("[{}] {}", entry.level, entry.message),
            }
        }
        printed_logs = printed_logs.max(snapshot.logs.len());
        if snapshot.ui_status != UiStatus::Running {
            break snapshot;
        }
        thread::sleep(Duration::from_millis(WATCH_RENDER_MS));
    };
    poller.stop();

    Ok(render_status(&final_snapshot))
}

fn handle_status(rest: &[String]) -> Result<String, String> {
    expect_no_args(rest, "status")?;
    let (paths, _) = load_context()?;
    let store = WorkflowStore::open(paths.root());
    Ok(render_status(&store.snapshot()))
}

fn handle_resolve(rest: &[String], approve: bool) -> Result<String, String> {
    expect_no_args(rest, if approve { "approve" } else { "reject" })?;
    let (paths, settings) = load_context()?;
    let client = backend_client(&settings);
    let store = WorkflowStore::open(paths.root());
    let resolver = InterruptResolver::new();
    let outcome = if approve {
        resolver.approve(&store, &client)
    } else {
        resolver.reject(&store, &client)
    };
    match outcome {
        ResolutionOutcome::Resumed => {
            Ok("interrupt approved; job resumed; run `opsdeck watch` to follow it".to_string())
        }
        ResolutionOutcome::Aborted { message } => Ok(match message {
            Some(message) => format!("interrupt rejected; job aborted: {message}"),
            None => "interrupt rejected; job aborted".to_string(),
        }),
        ResolutionOutcome::Failed { message } => Err(format!("resume failed: {message}")),
        ResolutionOutcome::NotInterrupted => {
            Err("no pending interrupt to resolve".to_string())
        }
        ResolutionOutcome::AlreadyInFlight => {
            Err("a resolution is already in flight".to_string())
        }
    }
}

fn handle_reset(rest: &[String]) -> Result<String, String> {
    expect_no_args(rest, "reset")?;
    let (paths, _) = load_context()?;
    let store = WorkflowStore::open(paths.root());
    store.reset();
    Ok("workflow state reset".to_string())
}

fn handle_metrics(rest: &[String]) -> Result<String, String> {
    expect_no_args(rest, "metrics")?;
    let (_, settings) = load_context()?;
    let client = backend_client(&settings);
    let summary = client.metrics_summary().map_err(|err| err.to_string())?;
    let breakdown = client.metrics_breakdown().map_err(|err| err.to_string())?;
    let timeseries = client.metrics_timeseries().map_err(|err| err.to_string())?;

    let mut lines = vec![
        format!("requests: {}", summary.total_requests),
        format!("error rate: {:.2}%", summary.error_rate * 100.0),
        format!("avg response: {:.1} ms", summary.avg_response_time),
        format!("active users: {}", summary.active_users),
    ];
    if !breakdown.is_empty() {
        lines.push("by service:".to_string());
        for entry in breakdown {
            lines.push(format!(
                "  {}: {} errors, {} warnings",
                entry.service, entry.errors, entry.warnings
            ));
        }
    }
    if let Some(latest) = timeseries.last() {
        lines.push(format!(
            "latest window ({}): {} requests, {} errors",
            latest.time, latest.requests, latest.errors
        ));
    }
    Ok(lines.join("\n"))
}
