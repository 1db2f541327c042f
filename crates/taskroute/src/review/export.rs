//! CSV export of feedback records.

use super::FeedbackRecord;

pub const CSV_HEADER: [&str; 7] = [
    "timestamp",
    "task",
    "reason",
    "prompt",
    "response",
    "comment",
    "reviewed",
];

/// Render records as CSV with a header row and CRLF line endings.
pub fn to_csv(records: &[FeedbackRecord]) -> String {
    let mut out = String::new();
    write_row(&mut out, CSV_HEADER);
    for record in records {
        let reviewed = if record.reviewed { "true" } else { "false" };
        write_row(
            &mut out,
            [
                record.log.timestamp.as_str(),
                record.log.task.as_str(),
                record.reason.label(),
                record.log.prompt.as_str(),
                record.log.response.as_str(),
                record.comment.as_str(),
                reviewed,
            ],
        );
    }
    out
}

fn write_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_field(out, field);
    }
    out.push_str("\r\n");
}

/// Quote a field when it contains a delimiter, quote, or line break.
fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}
