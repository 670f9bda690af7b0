use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadStatus {
    Hot,
    Warm,
    Cold,
}

impl LeadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hot => "Hot",
            Self::Warm => "Warm",
            Self::Cold => "Cold",
        }
    }

    /// Exact, case-sensitive match. `"hot"` is not a recognized status.
    pub fn classify(raw: &str) -> Option<Self> {
        match raw {
            "Hot" => Some(Self::Hot),
            "Warm" => Some(Self::Warm),
            "Cold" => Some(Self::Cold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QualifiedLead {
    pub name: String,
    pub score: f64,
    pub status: String,
    pub location: String,
}

impl QualifiedLead {
    pub fn lead_status(&self) -> Option<LeadStatus> {
        LeadStatus::classify(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IncomingLead {
    pub name: String,
    pub location: String,
    pub submitted_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDetail {
    pub name: String,
    pub appointment_start_time: String,
}

/// Normalized webhook payload. Wire casing is resolved by the source adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEnvelope {
    pub qualified_leads: Vec<QualifiedLead>,
    pub incoming_leads: Vec<IncomingLead>,
    pub appointment_details: Vec<AppointmentDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawData {
    pub qualified_leads: Vec<QualifiedLead>,
    pub incoming_leads: Vec<IncomingLead>,
    pub appointments: Vec<AppointmentDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCount {
    pub location: String,
    pub count: usize,
}

/// Location buckets kept in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct LocationCounts(Vec<LocationCount>);

impl LocationCounts {
    pub fn increment(&mut self, location: &str) {
        match self.0.iter_mut().find(|entry| entry.location == location) {
            Some(entry) => entry.count += 1,
            None => self.0.push(LocationCount {
                location: location.to_string(),
                count: 1,
            }),
        }
    }

    pub fn get(&self, location: &str) -> Option<usize> {
        self.0
            .iter()
            .find(|entry| entry.location == location)
            .map(|entry| entry.count)
    }

    pub fn total(&self) -> usize {
        self.0.iter().map(|entry| entry.count).sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocationCount> {
        self.0.iter()
    }
}

/// The five scalar counts retained between refreshes for trend arrows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetricCounts {
    pub total_leads: usize,
    pub hot: usize,
    pub warm: usize,
    pub cold: usize,
    pub appointments_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub snapshot_id: String,
    pub generated_at: DateTime<Utc>,
    pub total_leads: usize,
    pub hot: usize,
    pub warm: usize,
    pub cold: usize,
    pub avg_score: String,
    pub appointments_count: usize,
    pub conversion_rate: String,
    pub leads_by_location: LocationCounts,
    pub recent_leads: Vec<IncomingLead>,
    pub upcoming_appointments: Vec<AppointmentDetail>,
    pub raw_data: RawData,
}

impl DashboardMetrics {
    pub fn counts(&self) -> MetricCounts {
        MetricCounts {
            total_leads: self.total_leads,
            hot: self.hot,
            warm: self.warm,
            cold: self.cold,
            appointments_count: self.appointments_count,
        }
    }
}

// ─── Trends ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrendDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    pub direction: TrendDirection,
    pub magnitude: u64,
}

// ─── Export ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportKind {
    QualifiedLeads,
    IncomingLeads,
    Appointments,
    All,
}

impl ExportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QualifiedLeads => "qualified-leads",
            Self::IncomingLeads => "incoming-leads",
            Self::Appointments => "appointments",
            Self::All => "all",
        }
    }

    pub fn file_prefix(self) -> &'static str {
        match self {
            Self::QualifiedLeads => "qualified_leads",
            Self::IncomingLeads => "incoming_leads",
            Self::Appointments => "appointments",
            Self::All => "all_dashboard_data",
        }
    }
}

impl FromStr for ExportKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "qualified-leads" | "qualified" => Ok(Self::QualifiedLeads),
            "incoming-leads" | "incoming" => Ok(Self::IncomingLeads),
            "appointments" => Ok(Self::Appointments),
            "all" => Ok(Self::All),
            other => Err(format!("Unknown export kind '{}'.", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub kind: ExportKind,
    pub path: String,
    pub rows: usize,
    pub bytes: usize,
}

// ─── Dashboard view ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadState {
    Loading,
    Ready,
    Failed,
}

impl LoadState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricCard {
    pub title: String,
    pub value: String,
    pub description: String,
    pub trend: Option<Trend>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusShare {
    pub label: String,
    pub count: usize,
    pub percentage: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRow {
    pub name: String,
    pub location: String,
    pub submitted: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRow {
    pub client: String,
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub state: LoadState,
    pub stale: bool,
    pub last_error: Option<String>,
    pub last_updated: String,
    pub snapshot_id: Option<String>,
    pub cards: Vec<MetricCard>,
    pub status_distribution: Vec<StatusShare>,
    pub leads_by_location: Vec<LocationCount>,
    pub recent_leads: Vec<LeadRow>,
    pub appointments: Vec<AppointmentRow>,
}
