use crate::dashboard::DashboardCore;
use crate::models::ExportKind;
use crate::scheduler::ScheduleHandle;
use serde::Serialize;
use serde_json::json;

pub const HELP: &str = "commands: refresh | view | search appointments <term> | \
search leads <term> | export <qualified-leads|incoming-leads|appointments|all> | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTarget {
    Appointments,
    IncomingLeads,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Refresh,
    View,
    Search { target: SearchTarget, term: String },
    Export(ExportKind),
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb.to_ascii_lowercase().as_str() {
        "refresh" | "r" => Ok(ConsoleCommand::Refresh),
        "view" | "v" | "" => Ok(ConsoleCommand::View),
        "help" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
        "export" => rest.parse::<ExportKind>().map(ConsoleCommand::Export),
        "search" => {
            let (target, term) = match rest.split_once(char::is_whitespace) {
                Some((target, term)) => (target, term.trim()),
                None => (rest, ""),
            };
            let target = match target.to_ascii_lowercase().as_str() {
                "appointments" | "appointment" | "a" => SearchTarget::Appointments,
                "leads" | "lead" | "l" => SearchTarget::IncomingLeads,
                other => return Err(format!("Unknown search target '{}'.", other)),
            };
            Ok(ConsoleCommand::Search {
                target,
                term: term.to_string(),
            })
        }
        other => Err(format!("Unknown command '{}'. {}", other, HELP)),
    }
}

/// Runs one command against the core and renders the result as JSON. Refresh goes
/// through the schedule so it shares the periodic task; it is skipped while a
/// refresh is already running.
pub async fn execute(
    core: &DashboardCore,
    schedule: &ScheduleHandle,
    command: ConsoleCommand,
) -> Result<String, String> {
    match command {
        ConsoleCommand::Refresh => {
            if core.is_refreshing() {
                tracing::debug!("refresh already in progress, skipping manual refresh");
                return render(&json!({
                    "requested": false,
                    "reason": "refresh already in progress",
                }));
            }
            schedule.trigger();
            render(&json!({ "requested": true }))
        }
        ConsoleCommand::View => render(&core.view().await),
        ConsoleCommand::Search { target, term } => match target {
            SearchTarget::Appointments => render(&core.search_appointments(&term).await),
            SearchTarget::IncomingLeads => render(&core.search_incoming_leads(&term).await),
        },
        ConsoleCommand::Export(kind) => render(&core.export(kind).await.map_err(to_client_error)?),
        ConsoleCommand::Help => Ok(HELP.to_string()),
        ConsoleCommand::Quit => Ok(String::new()),
    }
}

fn render<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(to_client_error)
}

fn to_client_error(error: impl std::fmt::Display) -> String {
    error.to_string()
}
