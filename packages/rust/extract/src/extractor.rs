//! Pattern-based field extraction for certificate text.
//!
//! Certificates follow a fixed template, so each field is located by a
//! labelled regex. The holder fields are captured once per document and the
//! course codes fan the document out into one record per code.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use certledger_shared::ExtractedRecord;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"This is a statement that:\s*(.+)").expect("valid regex")
});

static CERTIFICATE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Certificate Number:\s*(\S+)").expect("valid regex")
});

static ISSUE_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Date of Issue:\s*(\d{1,2}-\w{3}-\d{2})").expect("valid regex")
});

static COURSE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"RII[A-Z]+\d+[A-Z]?").expect("valid regex"));

/// Holder fields found on a certificate, independent of its course codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateFields {
    pub name: Option<String>,
    pub certificate_number: Option<String>,
    pub issue_date: Option<String>,
}

/// Extract the holder fields from certificate text. First match wins.
pub fn extract_fields(text: &str) -> CertificateFields {
    CertificateFields {
        name: first_capture(&NAME_RE, text),
        certificate_number: first_capture(&CERTIFICATE_NUMBER_RE, text),
        issue_date: first_capture(&ISSUE_DATE_RE, text),
    }
}

/// All course codes in order of appearance, duplicates included.
pub fn course_codes(text: &str) -> Vec<&str> {
    COURSE_CODE_RE.find_iter(text).map(|m| m.as_str()).collect()
}

/// Turn one document's text into one record per course code.
///
/// A document without any course code yields nothing, even when the holder
/// fields were found. Never fails: missing fields are `None`.
pub fn extract(text: &str) -> Vec<ExtractedRecord> {
    let fields = extract_fields(text);
    let codes = course_codes(text);

    if codes.is_empty() {
        debug!(
            has_name = fields.name.is_some(),
            has_certificate_number = fields.certificate_number.is_some(),
            "no course codes found, document contributes no rows"
        );
        return Vec::new();
    }

    debug!(
        name = fields.name.as_deref().unwrap_or(""),
        course_codes = codes.len(),
        "extracted certificate"
    );

    codes
        .into_iter()
        .map(|code| ExtractedRecord {
            name: fields.name.clone(),
            certificate_number: fields.certificate_number.clone(),
            issue_date: fields.issue_date.clone(),
            course_code: code.to_string(),
        })
        .collect()
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "This is a statement that:\nAlice Smith\nCertificate Number: ABC123\nDate of Issue: 05-Jan-24\n...RIIHAN301E...RIIWHS204E...";

    #[test]
    fn sample_certificate_fans_out_per_course_code() {
        let records = extract(SAMPLE);
        assert_eq!(records.len(), 2);

        assert_eq!(
            records[0],
            ExtractedRecord {
                name: Some("Alice Smith".into()),
                certificate_number: Some("ABC123".into()),
                issue_date: Some("05-Jan-24".into()),
                course_code: "RIIHAN301E".into(),
            }
        );
        assert_eq!(records[1].course_code, "RIIWHS204E");
        assert_eq!(records[1].name, records[0].name);
        assert_eq!(records[1].certificate_number, records[0].certificate_number);
        assert_eq!(records[1].issue_date, records[0].issue_date);
    }

    #[test]
    fn no_course_codes_yields_no_records() {
        let text = "This is a statement that:\nAlice Smith\nCertificate Number: ABC123\nDate of Issue: 05-Jan-24\n";
        assert!(extract(text).is_empty());
        assert!(extract("").is_empty());
    }

    #[test]
    fn duplicate_codes_are_kept_in_order() {
        let text = "RIIWHS204E then RIIHAN301E then RIIWHS204E";
        let codes: Vec<String> = extract(text).into_iter().map(|r| r.course_code).collect();
        assert_eq!(codes, vec!["RIIWHS204E", "RIIHAN301E", "RIIWHS204E"]);
    }

    #[test]
    fn missing_markers_leave_fields_absent() {
        let records = extract("Unit RIIMPO320F completed");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, None);
        assert_eq!(records[0].certificate_number, None);
        assert_eq!(records[0].issue_date, None);
        assert_eq!(records[0].course_code, "RIIMPO320F");
    }

    #[test]
    fn first_marker_wins() {
        let text = "Certificate Number: FIRST1\nCertificate Number: SECOND2\nRIIHAN301E";
        let fields = extract_fields(text);
        assert_eq!(fields.certificate_number.as_deref(), Some("FIRST1"));
    }

    #[test]
    fn name_is_trimmed_and_stops_at_line_end() {
        let text = "This is a statement that:   \r\n   Alice Smith   \nhas completed";
        let fields = extract_fields(text);
        assert_eq!(fields.name.as_deref(), Some("Alice Smith"));
    }

    #[test]
    fn blank_name_after_marker_is_absent() {
        let fields = extract_fields("RIIHAN301E\nThis is a statement that:   ");
        assert_eq!(fields.name, None);

        let records = extract("RIIHAN301E\nThis is a statement that:   ");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, None);
    }

    #[test]
    fn name_on_same_line_as_marker() {
        let fields = extract_fields("This is a statement that: Bob Jones\nRIIHAN301E");
        assert_eq!(fields.name.as_deref(), Some("Bob Jones"));
    }

    #[test]
    fn malformed_date_is_absent() {
        let fields = extract_fields("Date of Issue: 2024-01-05");
        assert_eq!(fields.issue_date, None);

        let fields = extract_fields("Date of Issue: 5-Mar-23 extra");
        assert_eq!(fields.issue_date.as_deref(), Some("5-Mar-23"));
    }

    #[test]
    fn course_code_grammar() {
        assert_eq!(course_codes("RIIHAN301E"), vec!["RIIHAN301E"]);
        assert_eq!(course_codes("RIIHAN301"), vec!["RIIHAN301"]);
        // Lowercase prefix and missing digits do not match.
        assert!(course_codes("riihan301e RIIHAN RII301").is_empty());
        // Adjacent codes are split without overlap.
        assert_eq!(
            course_codes("RIIHAN301ERIIWHS204E"),
            vec!["RIIHAN301E", "RIIWHS204E"]
        );
    }
}
