use std::io::Write;

use super::actions_report::RemediationAction;
use super::content::ContentPerformance;

/// Row type that can be flattened into CSV fields under a fixed header.
pub trait CsvRecord {
    fn header() -> &'static [&'static str];
    fn fields(&self) -> Vec<String>;
}

/// Writes the header followed by one row per record.
///
/// The header is written explicitly so an empty export still has one line. Fields containing
/// commas, quotes, or newlines are quoted.
pub fn write_csv<W, R>(writer: W, records: &[R]) -> Result<(), csv::Error>
where
    W: Write,
    R: CsvRecord,
{
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(R::header())?;
    for record in records {
        csv_writer.write_record(record.fields())?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_string<R: CsvRecord>(records: &[R]) -> Result<String, csv::Error> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, records)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn format_rate(rate: f64) -> String {
    format!("{rate:.1}")
}

impl CsvRecord for ContentPerformance {
    fn header() -> &'static [&'static str] {
        &[
            "Content ID",
            "Title",
            "Category",
            "Type",
            "Views",
            "Completions",
            "Shares",
            "Likes",
            "Completion Rate (%)",
        ]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.content_id.clone(),
            self.title.clone(),
            self.category.clone(),
            self.content_type.clone(),
            self.views.to_string(),
            self.completions.to_string(),
            self.shares.to_string(),
            self.likes.to_string(),
            format_rate(self.completion_rate),
        ]
    }
}

impl CsvRecord for RemediationAction {
    fn header() -> &'static [&'static str] {
        &["ID", "Title", "Status", "Priority", "Owner", "Due Date"]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.title.clone(),
            self.status.label().to_string(),
            self.priority.label().to_string(),
            self.owner.clone().unwrap_or_default(),
            self.due_on
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(content_id: &str, title: &str) -> ContentPerformance {
        ContentPerformance {
            content_id: content_id.to_string(),
            title: title.to_string(),
            category: "phishing".to_string(),
            content_type: "video".to_string(),
            views: 4,
            completions: 1,
            shares: 0,
            likes: 2,
            completion_rate: 25.0,
        }
    }

    #[test]
    fn export_has_one_line_per_row_plus_header() {
        let rows = vec![
            row("c-1", "Spotting lures"),
            row("c-2", "Lures, links, and \"urgent\" asks"),
            row("c-3", "Reporting"),
        ];

        let csv = to_csv_string(&rows).expect("csv export");
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(csv.as_bytes());
        let records: Vec<csv::StringRecord> = reader
            .records()
            .collect::<Result<_, _>>()
            .expect("parse export");

        assert_eq!(records.len(), rows.len() + 1);
        assert!(records
            .iter()
            .all(|record| record.len() == ContentPerformance::header().len()));
        assert_eq!(&records[2][1], "Lures, links, and \"urgent\" asks");
        assert_eq!(&records[1][8], "25.0");
        assert!(csv.contains("\"Lures, links, and \"\"urgent\"\" asks\""));
    }

    #[test]
    fn empty_export_still_has_a_header() {
        let csv = to_csv_string::<ContentPerformance>(&[]).expect("csv export");
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("Content ID,Title"));
    }
}
