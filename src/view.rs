use crate::metrics::{format_one_decimal, location_label};
use crate::models::{
    AppointmentDetail, AppointmentRow, DashboardMetrics, IncomingLead, LeadRow, LeadStatus,
    MetricCard, MetricCounts, StatusShare,
};
use crate::timestamps::{date_and_time, format_relative};
use crate::trend::MetricTrends;
use chrono::{DateTime, FixedOffset, Utc};

const MISSING_NAME: &str = "N/A";

pub fn metric_cards(metrics: &DashboardMetrics, previous: Option<MetricCounts>) -> Vec<MetricCard> {
    let trends = MetricTrends::between(metrics.counts(), previous);
    let card = |title: &str, value: String, description: &str, trend| MetricCard {
        title: title.to_string(),
        value,
        description: description.to_string(),
        trend,
    };

    vec![
        card(
            "Total Leads",
            metrics.total_leads.to_string(),
            "Qualified leads in pipeline",
            trends.total_leads,
        ),
        card("Hot Leads", metrics.hot.to_string(), "High-priority prospects", trends.hot),
        card("Warm Leads", metrics.warm.to_string(), "Medium interest leads", trends.warm),
        card("Cold Leads", metrics.cold.to_string(), "Low engagement leads", trends.cold),
        card("Avg Lead Score", metrics.avg_score.clone(), "Out of 10 points", None),
        card(
            "Appointments",
            metrics.appointments_count.to_string(),
            "Scheduled meetings",
            trends.appointments_count,
        ),
        card(
            "Conversion Rate",
            format!("{}%", metrics.conversion_rate),
            "Leads converted to appointments",
            None,
        ),
    ]
}

/// Hot/Warm/Cold shares of the classified leads, for the distribution chart.
pub fn status_distribution(metrics: &DashboardMetrics) -> Vec<StatusShare> {
    let classified = metrics.hot + metrics.warm + metrics.cold;
    [
        (LeadStatus::Hot, metrics.hot),
        (LeadStatus::Warm, metrics.warm),
        (LeadStatus::Cold, metrics.cold),
    ]
    .into_iter()
    .map(|(status, count)| StatusShare {
        label: status.as_str().to_string(),
        count,
        percentage: if classified == 0 {
            "0".to_string()
        } else {
            format_one_decimal(count as f64 / classified as f64 * 100.0)
        },
    })
    .collect()
}

pub fn lead_rows(leads: &[IncomingLead], now: DateTime<Utc>) -> Vec<LeadRow> {
    leads
        .iter()
        .map(|lead| LeadRow {
            name: or_placeholder(&lead.name, MISSING_NAME),
            location: location_label(&lead.location).to_string(),
            submitted: format_relative(&lead.submitted_at, now),
        })
        .collect()
}

pub fn appointment_rows(
    appointments: &[AppointmentDetail],
    offset: FixedOffset,
) -> Vec<AppointmentRow> {
    appointments
        .iter()
        .map(|appointment| {
            let (date, time) = date_and_time(&appointment.appointment_start_time, offset);
            AppointmentRow {
                client: or_placeholder(&appointment.name, MISSING_NAME),
                date,
                time,
            }
        })
        .collect()
}

/// Case-insensitive substring match on client name; an empty term keeps everything.
/// The term is matched as typed, surrounding whitespace included.
pub fn search_appointments(
    appointments: &[AppointmentDetail],
    term: &str,
) -> Vec<AppointmentDetail> {
    let needle = term.to_lowercase();
    appointments
        .iter()
        .filter(|appointment| appointment.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

pub fn search_incoming_leads(leads: &[IncomingLead], term: &str) -> Vec<IncomingLead> {
    let needle = term.to_lowercase();
    leads
        .iter()
        .filter(|lead| {
            lead.name.to_lowercase().contains(&needle)
                || lead.location.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    if value.trim().is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}
