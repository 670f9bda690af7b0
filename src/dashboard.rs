use crate::config::AppSettings;
use crate::errors::{AppError, AppResult};
use crate::export::write_export;
use crate::metrics::aggregate;
use crate::models::{
    AppointmentDetail, DashboardMetrics, DashboardView, ExportKind, ExportResponse, IncomingLead,
    LoadState, MetricCounts,
};
use crate::source::DataSource;
use crate::timestamps::format_time;
use crate::trend::MetricTrends;
use crate::view::{
    appointment_rows, lead_rows, metric_cards, search_appointments, search_incoming_leads,
    status_distribution,
};
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

const NO_UPDATE_YET: &str = "--:--";

struct DashboardState {
    current: Option<Arc<DashboardMetrics>>,
    previous: Option<MetricCounts>,
    load_state: LoadState,
    stale: bool,
    last_error: Option<String>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            current: None,
            previous: None,
            load_state: LoadState::Loading,
            stale: false,
            last_error: None,
        }
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Holds the last good snapshot and the counts of the one before it.
#[derive(Clone)]
pub struct DashboardCore {
    source: Arc<dyn DataSource>,
    settings: Arc<AppSettings>,
    state: Arc<RwLock<DashboardState>>,
    in_flight: Arc<AtomicUsize>,
}

impl DashboardCore {
    pub fn new(source: Arc<dyn DataSource>, settings: AppSettings) -> Self {
        Self {
            source,
            settings: Arc::new(settings),
            state: Arc::new(RwLock::new(DashboardState::default())),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Fetches and swaps in a new snapshot. Overlapping calls resolve last-writer-wins.
    pub async fn refresh(&self) -> AppResult<Arc<DashboardMetrics>> {
        let _guard = InFlightGuard::enter(&self.in_flight);
        let fetched = self.source.fetch().await;

        let mut state = self.state.write().await;
        match fetched {
            Ok(envelope) => {
                let metrics = Arc::new(aggregate(
                    envelope,
                    Uuid::new_v4().to_string(),
                    Utc::now(),
                ));
                state.previous = state.current.as_ref().map(|current| current.counts());
                state.current = Some(metrics.clone());
                state.load_state = LoadState::Ready;
                state.stale = false;
                state.last_error = None;
                tracing::info!(
                    snapshot_id = %metrics.snapshot_id,
                    total_leads = metrics.total_leads,
                    appointments = metrics.appointments_count,
                    "dashboard snapshot refreshed"
                );
                Ok(metrics)
            }
            Err(error) => {
                if state.current.is_some() {
                    state.stale = true;
                    tracing::warn!(error = %error, "refresh failed, keeping last snapshot");
                } else {
                    state.load_state = LoadState::Failed;
                    tracing::error!(error = %error, "initial dashboard load failed");
                }
                state.last_error = Some(error.to_string());
                Err(error)
            }
        }
    }

    pub async fn snapshot(&self) -> Option<Arc<DashboardMetrics>> {
        self.state.read().await.current.clone()
    }

    pub async fn previous_counts(&self) -> Option<MetricCounts> {
        self.state.read().await.previous
    }

    pub async fn load_state(&self) -> LoadState {
        self.state.read().await.load_state
    }

    pub async fn trends(&self) -> Option<MetricTrends> {
        let state = self.state.read().await;
        state
            .current
            .as_ref()
            .map(|current| MetricTrends::between(current.counts(), state.previous))
    }

    pub async fn view(&self) -> DashboardView {
        let state = self.state.read().await;
        let offset = self.settings.display_offset();
        let now = Utc::now();

        let mut view = DashboardView {
            state: state.load_state,
            stale: state.stale,
            last_error: state.last_error.clone(),
            last_updated: NO_UPDATE_YET.to_string(),
            snapshot_id: None,
            cards: Vec::new(),
            status_distribution: Vec::new(),
            leads_by_location: Vec::new(),
            recent_leads: Vec::new(),
            appointments: Vec::new(),
        };

        if let Some(metrics) = state.current.as_ref() {
            view.last_updated = format_time(metrics.generated_at, offset);
            view.snapshot_id = Some(metrics.snapshot_id.clone());
            view.cards = metric_cards(metrics, state.previous);
            view.status_distribution = status_distribution(metrics);
            view.leads_by_location = metrics.leads_by_location.iter().cloned().collect();
            view.recent_leads = lead_rows(&metrics.recent_leads, now);
            view.appointments = appointment_rows(&metrics.upcoming_appointments, offset);
        }
        view
    }

    pub async fn search_appointments(&self, term: &str) -> Vec<AppointmentDetail> {
        match self.snapshot().await {
            Some(metrics) => search_appointments(&metrics.upcoming_appointments, term),
            None => Vec::new(),
        }
    }

    pub async fn search_incoming_leads(&self, term: &str) -> Vec<IncomingLead> {
        match self.snapshot().await {
            Some(metrics) => search_incoming_leads(&metrics.raw_data.incoming_leads, term),
            None => Vec::new(),
        }
    }

    pub async fn export(&self, kind: ExportKind) -> AppResult<ExportResponse> {
        let metrics = self
            .snapshot()
            .await
            .ok_or_else(|| AppError::NotFound("No dashboard data loaded yet".to_string()))?;
        write_export(
            kind,
            &metrics,
            &self.settings.export_dir,
            Utc::now(),
            self.settings.display_offset(),
        )
    }
}
