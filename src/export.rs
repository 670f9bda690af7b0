use crate::errors::{AppError, AppResult};
use crate::models::{
    AppointmentDetail, DashboardMetrics, ExportKind, ExportResponse, IncomingLead, QualifiedLead,
};
use crate::timestamps::{date_and_time, date_time_or_invalid, format_file_stamp};
use chrono::{DateTime, FixedOffset, Utc};
use std::path::Path;

const QUALIFIED_SECTION: &str = "=== QUALIFIED LEADS ===";
const INCOMING_SECTION: &str = "=== INCOMING LEADS ===";
const APPOINTMENTS_SECTION: &str = "=== APPOINTMENTS ===";

/// A row type with a fixed column layout.
pub trait CsvRecord {
    const HEADERS: &'static [&'static str];

    fn fields(&self, offset: FixedOffset) -> Vec<String>;
}

impl CsvRecord for QualifiedLead {
    const HEADERS: &'static [&'static str] = &["Name", "Score", "Status", "Location"];

    fn fields(&self, _offset: FixedOffset) -> Vec<String> {
        vec![
            self.name.clone(),
            self.score.to_string(),
            self.status.clone(),
            self.location.clone(),
        ]
    }
}

impl CsvRecord for IncomingLead {
    const HEADERS: &'static [&'static str] = &["Name", "Location", "Submitted At"];

    fn fields(&self, offset: FixedOffset) -> Vec<String> {
        vec![
            self.name.clone(),
            self.location.clone(),
            date_time_or_invalid(&self.submitted_at, offset),
        ]
    }
}

impl CsvRecord for AppointmentDetail {
    const HEADERS: &'static [&'static str] =
        &["Client Name", "Appointment Date", "Appointment Time"];

    fn fields(&self, offset: FixedOffset) -> Vec<String> {
        let (date, time) = date_and_time(&self.appointment_start_time, offset);
        vec![self.name.clone(), date, time]
    }
}

/// Quotes a field containing a comma, double quote or newline; embedded quotes are doubled.
pub fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn csv_lines<R: CsvRecord>(rows: &[R], offset: FixedOffset) -> Vec<String> {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(R::HEADERS.join(","));
    lines.extend(rows.iter().map(|row| {
        row.fields(offset)
            .iter()
            .map(|field| escape_csv_field(field))
            .collect::<Vec<_>>()
            .join(",")
    }));
    lines
}

/// Header row followed by one line per row, in the order given.
pub fn to_csv<R: CsvRecord>(rows: &[R], offset: FixedOffset) -> String {
    csv_lines(rows, offset).join("\n")
}

pub fn all_data_csv(
    qualified_leads: &[QualifiedLead],
    incoming_leads: &[IncomingLead],
    appointments: &[AppointmentDetail],
    offset: FixedOffset,
) -> String {
    let mut lines = vec![QUALIFIED_SECTION.to_string()];
    lines.extend(csv_lines(qualified_leads, offset));
    lines.push(String::new());
    lines.push(INCOMING_SECTION.to_string());
    lines.extend(csv_lines(incoming_leads, offset));
    lines.push(String::new());
    lines.push(APPOINTMENTS_SECTION.to_string());
    lines.extend(csv_lines(appointments, offset));
    lines.join("\n")
}

/// Renders one export variant, returning the document and its data row count.
pub fn render_export(
    kind: ExportKind,
    metrics: &DashboardMetrics,
    offset: FixedOffset,
) -> (String, usize) {
    let raw = &metrics.raw_data;
    match kind {
        ExportKind::QualifiedLeads => (
            to_csv(&raw.qualified_leads, offset),
            raw.qualified_leads.len(),
        ),
        ExportKind::IncomingLeads => (
            to_csv(&raw.incoming_leads, offset),
            raw.incoming_leads.len(),
        ),
        ExportKind::Appointments => (
            to_csv(&metrics.upcoming_appointments, offset),
            metrics.upcoming_appointments.len(),
        ),
        ExportKind::All => (
            all_data_csv(
                &raw.qualified_leads,
                &raw.incoming_leads,
                &metrics.upcoming_appointments,
                offset,
            ),
            raw.qualified_leads.len()
                + raw.incoming_leads.len()
                + metrics.upcoming_appointments.len(),
        ),
    }
}

pub fn export_file_name(kind: ExportKind, now: DateTime<Utc>, offset: FixedOffset) -> String {
    format!("{}_{}.csv", kind.file_prefix(), format_file_stamp(now, offset))
}

pub fn write_export(
    kind: ExportKind,
    metrics: &DashboardMetrics,
    export_dir: &Path,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> AppResult<ExportResponse> {
    std::fs::create_dir_all(export_dir).map_err(|error| AppError::Io(error.to_string()))?;

    let output_path = export_dir.join(export_file_name(kind, now, offset));
    if !output_path.starts_with(export_dir) {
        return Err(AppError::Io("Resolved export path escaped export directory".to_string()));
    }

    let (contents, rows) = render_export(kind, metrics, offset);
    std::fs::write(&output_path, &contents).map_err(|error| AppError::Io(error.to_string()))?;
    tracing::info!(
        kind = kind.as_str(),
        rows,
        path = %output_path.display(),
        "export written"
    );

    Ok(ExportResponse {
        kind,
        path: output_path.to_string_lossy().to_string(),
        rows,
        bytes: contents.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::{all_data_csv, escape_csv_field, export_file_name, to_csv, write_export};
    use crate::metrics::aggregate;
    use crate::models::{
        AppointmentDetail, ExportKind, IncomingLead, QualifiedLead, WebhookEnvelope,
    };
    use crate::timestamps::display_offset;
    use chrono::{TimeZone, Utc};

    fn qualified(name: &str, location: &str) -> QualifiedLead {
        QualifiedLead {
            name: name.to_string(),
            score: 7.5,
            status: "Warm".to_string(),
            location: location.to_string(),
        }
    }

    fn parse_rows(document: &str) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(document.as_bytes());
        reader
            .records()
            .map(|record| {
                record
                    .expect("valid csv record")
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn escapes_only_when_needed() {
        assert_eq!(escape_csv_field("plain"), "plain");
        assert_eq!(escape_csv_field("Austin, TX"), "\"Austin, TX\"");
        assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn qualified_leads_round_trip_through_a_csv_parser() {
        let leads = vec![
            qualified("Jane \"JD\" Doe", "Austin, TX"),
            qualified("Sam", "Multi\nLine"),
            QualifiedLead {
                name: "Lee".to_string(),
                score: 8.0,
                status: "Hot".to_string(),
                location: "Dallas".to_string(),
            },
        ];
        let document = to_csv(&leads, display_offset(0));
        assert!(document.starts_with("Name,Score,Status,Location\n"));
        assert!(document.contains("\"Austin, TX\""));

        let rows = parse_rows(&document);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], vec!["Jane \"JD\" Doe", "7.5", "Warm", "Austin, TX"]);
        assert_eq!(rows[2][3], "Multi\nLine");
        assert_eq!(rows[3], vec!["Lee", "8", "Hot", "Dallas"]);
    }

    #[test]
    fn empty_list_still_has_header() {
        let document = to_csv::<IncomingLead>(&[], display_offset(0));
        assert_eq!(document, "Name,Location,Submitted At");
    }

    #[test]
    fn appointment_rows_split_date_and_time() {
        let rows = vec![
            AppointmentDetail {
                name: "Client A".to_string(),
                appointment_start_time: "2025-01-05T14:30:00Z".to_string(),
            },
            AppointmentDetail {
                name: "Client B".to_string(),
                appointment_start_time: "whenever".to_string(),
            },
        ];
        let document = to_csv(&rows, display_offset(0));
        let lines = document.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Client Name,Appointment Date,Appointment Time");
        assert_eq!(lines[1], "Client A,\"Jan 5, 2025\",2:30 PM");
        assert_eq!(lines[2], "Client B,Invalid date,");
    }

    #[test]
    fn all_data_has_three_sections_separated_by_blank_lines() {
        let incoming = vec![IncomingLead {
            name: "Pat".to_string(),
            location: "Austin".to_string(),
            submitted_at: "2025-01-05T09:05:00Z".to_string(),
        }];
        let document = all_data_csv(
            &[qualified("Jo", "Austin")],
            &incoming,
            &[],
            display_offset(0),
        );
        let lines = document.split('\n').collect::<Vec<_>>();
        assert_eq!(
            lines,
            vec![
                "=== QUALIFIED LEADS ===",
                "Name,Score,Status,Location",
                "Jo,7.5,Warm,Austin",
                "",
                "=== INCOMING LEADS ===",
                "Name,Location,Submitted At",
                "Pat,Austin,\"Jan 5, 2025 9:05 AM\"",
                "",
                "=== APPOINTMENTS ===",
                "Client Name,Appointment Date,Appointment Time",
            ]
        );
    }

    #[test]
    fn file_names_use_prefix_and_timestamp() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 7, 4, 5).single().expect("valid date");
        assert_eq!(
            export_file_name(ExportKind::All, now, display_offset(0)),
            "all_dashboard_data_2025-03-09_07-04-05.csv"
        );
        assert_eq!(
            export_file_name(ExportKind::QualifiedLeads, now, display_offset(0)),
            "qualified_leads_2025-03-09_07-04-05.csv"
        );
    }

    #[test]
    fn appointments_export_in_display_order() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 7, 4, 5).single().expect("valid date");
        let metrics = aggregate(
            WebhookEnvelope {
                appointment_details: vec![
                    AppointmentDetail {
                        name: "Later".to_string(),
                        appointment_start_time: "2025-04-01T10:00:00Z".to_string(),
                    },
                    AppointmentDetail {
                        name: "Sooner".to_string(),
                        appointment_start_time: "2025-03-10T10:00:00Z".to_string(),
                    },
                ],
                ..Default::default()
            },
            "snap".to_string(),
            now,
        );

        let dir = tempfile::tempdir().expect("temp dir");
        let export_dir = dir.path().join("exports");
        let response = write_export(
            ExportKind::Appointments,
            &metrics,
            &export_dir,
            now,
            display_offset(0),
        )
        .expect("export written");
        assert_eq!(response.rows, 2);
        assert!(response.path.ends_with("appointments_2025-03-09_07-04-05.csv"));

        let contents = std::fs::read_to_string(&response.path).expect("read export");
        assert_eq!(contents.len(), response.bytes);
        let rows = parse_rows(&contents);
        assert_eq!(rows[1][0], "Sooner");
        assert_eq!(rows[2][0], "Later");
    }
}
