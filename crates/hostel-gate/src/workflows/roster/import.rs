use std::io::Read;

use serde::Serialize;

use super::domain::{EnrollmentNumber, StudentProfile, StudyYear};

/// One usable roster row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RosterRow {
    pub(crate) line: u64,
    pub(crate) enrollment: EnrollmentNumber,
    pub(crate) full_name: String,
    pub(crate) details: RosterDetails,
}

/// Optional trailing columns: course, year, room, phone, hostel, guardian, emergency phone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RosterDetails {
    course: Option<String>,
    year: Option<StudyYear>,
    room_number: Option<String>,
    phone: Option<String>,
    hostel_name: Option<String>,
    guardian_name: Option<String>,
    emergency_phone: Option<String>,
}

impl RosterDetails {
    pub(crate) fn apply(&self, profile: &mut StudentProfile) {
        let fields = [
            (&self.course, &mut profile.course),
            (&self.room_number, &mut profile.room_number),
            (&self.phone, &mut profile.phone),
            (&self.hostel_name, &mut profile.hostel_name),
            (&self.guardian_name, &mut profile.guardian_name),
            (&self.emergency_phone, &mut profile.emergency_phone),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                slot.clone_from(value);
            }
        }
        if let Some(year) = self.year {
            profile.year = year;
        }
    }
}

/// Problem with a single row that did not stop the import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    pub line: u64,
    pub detail: String,
}

/// Outcome of a roster import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub issues: Vec<RowIssue>,
}

#[derive(Debug, Default)]
pub(crate) struct ParsedRoster {
    pub(crate) rows: Vec<RosterRow>,
    pub(crate) skipped: usize,
    pub(crate) issues: Vec<RowIssue>,
}

/// Reads a header-less roster. Rows shorter than two columns, or whose first cell looks like
/// a header, are skipped.
pub(crate) fn parse_roster<R: Read>(reader: R) -> Result<ParsedRoster, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut parsed = ParsedRoster::default();

    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map(|position| position.line())
            .unwrap_or(index as u64 + 1);

        if record.len() < 2 || record[0].to_lowercase().contains("enrollment") {
            parsed.skipped += 1;
            continue;
        }

        let enrollment = match EnrollmentNumber::parse(&record[0]) {
            Ok(enrollment) => enrollment,
            Err(err) => {
                parsed.skipped += 1;
                parsed.issues.push(RowIssue {
                    line,
                    detail: err.to_string(),
                });
                continue;
            }
        };

        let full_name = record[1].to_string();
        if full_name.is_empty() {
            parsed.skipped += 1;
            parsed.issues.push(RowIssue {
                line,
                detail: format!("{enrollment}: full name must not be blank"),
            });
            continue;
        }

        let cell = |position: usize| {
            record
                .get(position)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let year = match cell(3).map(|raw| raw.parse::<i64>()) {
            None => None,
            Some(Ok(value)) => match StudyYear::new(value) {
                Ok(year) => Some(year),
                Err(err) => {
                    parsed.issues.push(RowIssue {
                        line,
                        detail: format!("{enrollment}: {err}"),
                    });
                    None
                }
            },
            Some(Err(_)) => {
                parsed.issues.push(RowIssue {
                    line,
                    detail: format!("{enrollment}: year is not a number"),
                });
                None
            }
        };

        parsed.rows.push(RosterRow {
            line,
            enrollment,
            full_name,
            details: RosterDetails {
                course: cell(2),
                year,
                room_number: cell(4),
                phone: cell(5),
                hostel_name: cell(6),
                guardian_name: cell(7),
                emergency_phone: cell(8),
            },
        });
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_header_and_short_rows() {
        let csv = "Enrollment Number,Full Name\nCS101,Asha Rao\nlonely\nCS102, Vikram Shah \n";
        let parsed = parse_roster(csv.as_bytes()).expect("roster parses");

        assert_eq!(parsed.skipped, 2);
        let names: Vec<_> = parsed
            .rows
            .iter()
            .map(|row| (row.enrollment.as_str(), row.full_name.as_str()))
            .collect();
        assert_eq!(names, vec![("CS101", "Asha Rao"), ("CS102", "Vikram Shah")]);
    }

    #[test]
    fn reads_optional_profile_columns() {
        let csv = "EE201,Meera Iyer,B.Tech EEE,3,C-14,9000000001,Nilgiri,R. Iyer,9000000002\n";
        let parsed = parse_roster(csv.as_bytes()).expect("roster parses");
        let row = &parsed.rows[0];

        let mut profile = StudentProfile::default();
        row.details.apply(&mut profile);
        assert_eq!(profile.course, "B.Tech EEE");
        assert_eq!(profile.year.get(), 3);
        assert_eq!(profile.room_number, "C-14");
        assert_eq!(profile.hostel_name, "Nilgiri");
        assert_eq!(profile.emergency_phone, "9000000002");
    }

    #[test]
    fn invalid_year_is_reported_but_row_kept() {
        let csv = "ME301,Kabir Sen,B.Tech ME,7\n";
        let parsed = parse_roster(csv.as_bytes()).expect("roster parses");

        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].details, RosterDetails {
            course: Some("B.Tech ME".to_string()),
            ..RosterDetails::default()
        });
        assert_eq!(parsed.issues.len(), 1);
        assert!(parsed.issues[0].detail.contains("year"));
    }
}
