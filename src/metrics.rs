use crate::models::{
    AppointmentDetail, DashboardMetrics, IncomingLead, LeadStatus, LocationCounts, RawData,
    WebhookEnvelope,
};
use crate::timestamps::parse_timestamp;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

pub const RECENT_LEADS_LIMIT: usize = 5;
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Derives a fresh snapshot from one envelope. Pure: the caller supplies the
/// snapshot identity and time.
pub fn aggregate(
    envelope: WebhookEnvelope,
    snapshot_id: String,
    generated_at: DateTime<Utc>,
) -> DashboardMetrics {
    let WebhookEnvelope {
        qualified_leads,
        incoming_leads,
        appointment_details,
    } = envelope;

    let total_leads = qualified_leads.len();
    let (mut hot, mut warm, mut cold) = (0usize, 0usize, 0usize);
    let mut score_sum = 0.0f64;
    let mut leads_by_location = LocationCounts::default();

    for lead in &qualified_leads {
        match lead.lead_status() {
            Some(LeadStatus::Hot) => hot += 1,
            Some(LeadStatus::Warm) => warm += 1,
            Some(LeadStatus::Cold) => cold += 1,
            None => {}
        }
        if lead.score.is_finite() {
            score_sum += lead.score;
        }
        leads_by_location.increment(location_label(&lead.location));
    }

    let appointments_count = appointment_details.len();
    let avg_score = if total_leads == 0 {
        "0".to_string()
    } else {
        format_one_decimal(score_sum / total_leads as f64)
    };
    let conversion_rate = conversion_label(appointments_count, total_leads);

    DashboardMetrics {
        snapshot_id,
        generated_at,
        total_leads,
        hot,
        warm,
        cold,
        avg_score,
        appointments_count,
        conversion_rate,
        leads_by_location,
        recent_leads: recent_leads(&incoming_leads),
        upcoming_appointments: sort_appointments(&appointment_details),
        raw_data: RawData {
            qualified_leads,
            incoming_leads,
            appointments: appointment_details,
        },
    }
}

pub fn location_label(raw: &str) -> &str {
    if raw.is_empty() {
        UNKNOWN_LOCATION
    } else {
        raw
    }
}

/// Appointments as a percentage of leads. No leads or no appointments render as `"0"`.
fn conversion_label(appointments: usize, leads: usize) -> String {
    if leads == 0 || appointments == 0 {
        return "0".to_string();
    }
    format_one_decimal(appointments as f64 / leads as f64 * 100.0)
}

/// One decimal place of the exact binary value. Exact ties round away from zero.
pub fn format_one_decimal(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    // Only odd multiples of 0.25 sit exactly on a `.x5` boundary.
    let on_tie = (value * 4.0).fract() == 0.0 && (value * 2.0).fract() != 0.0;
    let value = if on_tie {
        (value * 10.0).round() / 10.0
    } else {
        value
    };
    let label = format!("{:.1}", value);
    if label == "-0.0" {
        "0.0".to_string()
    } else {
        label
    }
}

pub fn recent_leads(incoming: &[IncomingLead]) -> Vec<IncomingLead> {
    let start = incoming.len().saturating_sub(RECENT_LEADS_LIMIT);
    incoming[start..].iter().rev().cloned().collect()
}

/// Stable ascending sort by start time. Unparseable times go last in source order.
pub fn sort_appointments(appointments: &[AppointmentDetail]) -> Vec<AppointmentDetail> {
    let mut keyed = appointments
        .iter()
        .map(|appointment| (parse_timestamp(&appointment.appointment_start_time), appointment))
        .collect::<Vec<_>>();
    keyed.sort_by(|(left, _), (right, _)| compare_start_times(left.as_ref(), right.as_ref()));
    keyed.into_iter().map(|(_, appointment)| appointment.clone()).collect()
}

fn compare_start_times(left: Option<&DateTime<Utc>>, right: Option<&DateTime<Utc>>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => left.cmp(right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
