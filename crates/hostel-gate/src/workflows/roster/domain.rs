use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::validation::ValidationError;

/// Enrollment number as entered by staff; comparisons ignore ASCII case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EnrollmentNumber(String);

impl EnrollmentNumber {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::BlankEnrollment);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive equality against raw user input.
    pub fn matches(&self, raw: &str) -> bool {
        self.0.eq_ignore_ascii_case(raw.trim())
    }

    pub(crate) fn key(&self) -> String {
        self.0.to_ascii_uppercase()
    }
}

impl PartialEq for EnrollmentNumber {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for EnrollmentNumber {}

impl Hash for EnrollmentNumber {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for EnrollmentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EnrollmentNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EnrollmentNumber> for String {
    fn from(value: EnrollmentNumber) -> Self {
        value.0
    }
}

/// Year of study, restricted to 1 through 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct StudyYear(u8);

impl StudyYear {
    pub const FIRST: StudyYear = StudyYear(1);

    pub fn new(year: i64) -> Result<Self, ValidationError> {
        if (1..=4).contains(&year) {
            Ok(Self(year as u8))
        } else {
            Err(ValidationError::YearOutOfRange(year))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for StudyYear {
    fn default() -> Self {
        Self::FIRST
    }
}

impl TryFrom<i64> for StudyYear {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StudyYear> for u8 {
    fn from(value: StudyYear) -> Self {
        value.0
    }
}

/// Where the student currently is relative to the campus gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    #[default]
    Inside,
    Outside,
}

impl GateState {
    pub const fn label(self) -> &'static str {
        match self {
            GateState::Inside => "inside",
            GateState::Outside => "outside",
        }
    }

    pub const fn is_inside(self) -> bool {
        matches!(self, GateState::Inside)
    }
}

/// Profile fields captured at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub full_name: String,
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub year: StudyYear,
    #[serde(default)]
    pub hostel_name: String,
    #[serde(default)]
    pub room_number: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub guardian_name: String,
    #[serde(default)]
    pub emergency_phone: String,
}

/// Opaque link to an authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountId(pub String);

/// Hostel resident tracked by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub enrollment_number: EnrollmentNumber,
    pub profile: StudentProfile,
    pub gate_state: GateState,
    pub account: Option<AccountId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn full_name(&self) -> &str {
        &self.profile.full_name
    }

    pub fn is_inside(&self) -> bool {
        self.gate_state.is_inside()
    }
}

/// Registration payload for a student created by staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    pub enrollment_number: String,
    #[serde(flatten)]
    pub profile: StudentProfile,
    #[serde(default)]
    pub gate_state: GateState,
    #[serde(default)]
    pub account: Option<AccountId>,
}

/// Fields a student may change on their own profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub hostel_name: Option<String>,
    pub room_number: Option<String>,
    pub phone: Option<String>,
}

impl ProfileUpdate {
    pub(crate) fn apply(self, profile: &mut StudentProfile) {
        if let Some(hostel_name) = self.hostel_name {
            profile.hostel_name = hostel_name.trim().to_string();
        }
        if let Some(room_number) = self.room_number {
            profile.room_number = room_number.trim().to_string();
        }
        if let Some(phone) = self.phone {
            profile.phone = phone.trim().to_string();
        }
    }
}

/// Exposed student summary for gate and lookup payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentView {
    pub enrollment_number: String,
    pub full_name: String,
    pub course: String,
    pub year: u8,
    pub hostel_name: String,
    pub room_number: String,
    pub gate_state: &'static str,
}

impl From<&Student> for StudentView {
    fn from(student: &Student) -> Self {
        Self {
            enrollment_number: student.enrollment_number.to_string(),
            full_name: student.profile.full_name.clone(),
            course: student.profile.course.clone(),
            year: student.profile.year.get(),
            hostel_name: student.profile.hostel_name.clone(),
            room_number: student.profile.room_number.clone(),
            gate_state: student.gate_state.label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enrollment_numbers_compare_case_insensitively() {
        let upper = EnrollmentNumber::parse(" CS101 ").expect("valid");
        let lower = EnrollmentNumber::parse("cs101").expect("valid");
        assert_eq!(upper, lower);
        assert_eq!(upper.as_str(), "CS101");
        assert!(upper.matches("Cs101"));
        assert_eq!(
            EnrollmentNumber::parse("   "),
            Err(ValidationError::BlankEnrollment)
        );
    }

    #[test]
    fn study_year_rejects_out_of_range_values() {
        assert_eq!(StudyYear::new(4).map(StudyYear::get), Ok(4));
        assert_eq!(StudyYear::new(0), Err(ValidationError::YearOutOfRange(0)));
        assert!(serde_json::from_str::<StudyYear>("5").is_err());
    }

    #[test]
    fn profile_update_touches_only_supplied_fields() {
        let mut profile = StudentProfile {
            full_name: "Asha Rao".to_string(),
            hostel_name: "Aravali".to_string(),
            room_number: "B-12".to_string(),
            ..StudentProfile::default()
        };

        ProfileUpdate {
            room_number: Some(" C-04 ".to_string()),
            ..ProfileUpdate::default()
        }
        .apply(&mut profile);

        assert_eq!(profile.room_number, "C-04");
        assert_eq!(profile.hostel_name, "Aravali");
    }
}
