use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::DEFAULT_PAGE_SIZE;
use crate::error::ValidationError;
use crate::wire::{lenient_string, opt_code, opt_string_or_number};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(#[serde(deserialize_with = "crate::wire::string_or_number")] pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Backend partition ("community") identifier, e.g. `"61476"`.
    CommunityId
);
string_id!(
    /// Partition-local employee record id.
    EmployeeId
);
string_id!(
    /// Partition-local department id. Never meaningful outside its partition.
    DepartmentId
);
string_id!(DeviceId);

// ---------------------------------------------------------------------------
// Gender
// ---------------------------------------------------------------------------

/// Tri-state gender. Wire codes: `0` male, `1` female, `-1` unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    pub fn code(self) -> i8 {
        match self {
            Self::Male => 0,
            Self::Female => 1,
            Self::Unknown => -1,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Male,
            1 => Self::Female,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Unknown => "Unknown",
        }
    }
}

impl Serialize for Gender {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.code())
    }
}

impl<'de> Deserialize<'de> for Gender {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(opt_code(deserializer)?
            .map(Gender::from_code)
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Departments
// ---------------------------------------------------------------------------

/// One entry of a partition's department catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Department {
    pub id: DepartmentId,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
}

// ---------------------------------------------------------------------------
// Authorized drivers
// ---------------------------------------------------------------------------

/// The operator-facing authorized-driver record, as submitted by the add and
/// edit forms.
///
/// `card_no` is the correlation key: it is the only field used to find "the
/// same" person in another community.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriverRecord {
    pub name: String,
    pub card_no: String,
    pub emp_no: String,
    #[serde(default)]
    pub job: Option<String>,
    /// Department in the home community.
    #[serde(rename = "dept")]
    pub department: DepartmentId,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub phone: Option<String>,
}

impl DriverRecord {
    /// Reject records the backend must never see.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::NameRequired);
        }
        let card = self.card_no.trim();
        if card.is_empty() {
            return Err(ValidationError::CardNoRequired);
        }
        if is_zero_card(card) {
            return Err(ValidationError::CardNoZero);
        }
        if self.emp_no.trim().is_empty() {
            return Err(ValidationError::EmpNoRequired);
        }
        if self.department.as_str().trim().is_empty() {
            return Err(ValidationError::DepartmentRequired);
        }
        Ok(())
    }

    /// Copy of this record pointing at a department of another community.
    pub fn with_department(&self, department: DepartmentId) -> Self {
        Self {
            department,
            ..self.clone()
        }
    }
}

/// `true` when the card number consists only of `0` digits.
pub fn is_zero_card(card_no: &str) -> bool {
    let card = card_no.trim();
    !card.is_empty() && card.bytes().all(|b| b == b'0')
}

/// An employee row as returned by the list and detail endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRow {
    pub id: EmployeeId,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub uuid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub card_no: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub emp_no: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub job: Option<String>,
    #[serde(default, alias = "deptId", deserialize_with = "opt_string_or_number")]
    pub dept: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub dept_name: Option<String>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub create_time: Option<String>,
}

// ---------------------------------------------------------------------------
// Paging
// ---------------------------------------------------------------------------

/// One page of a list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    #[serde(default)]
    pub total_count: u64,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            total_count: 0,
        }
    }
}

/// Filters and pagination of the driver list view. `page` is 1-based.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PageQuery {
    pub name: Option<String>,
    pub emp_no: Option<String>,
    pub card_no: Option<String>,
    pub dept: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            name: None,
            emp_no: None,
            card_no: None,
            dept: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageQuery {
    /// Lookup of a single person by correlation key.
    pub fn by_card_no(card_no: &str) -> Self {
        Self {
            card_no: Some(card_no.to_string()),
            ..Self::default()
        }
    }

    pub fn with_page(&self, page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size,
            ..self.clone()
        }
    }

    /// Non-empty filters as `(wire name, value)` pairs.
    pub fn filters(&self) -> Vec<(&'static str, &str)> {
        [
            ("name", &self.name),
            ("empNo", &self.emp_no),
            ("cardNo", &self.card_no),
            ("dept", &self.dept),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (key, v))
        })
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// Device serial -> last-seen timestamp, exactly as the backend reported it.
pub type LastSeenMap = std::collections::BTreeMap<String, String>;

/// Community scope of device calls. Devices are never fanned out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceScope {
    pub community_id: CommunityId,
    #[serde(default)]
    pub community_uuid: Option<String>,
}

/// An access-control device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub id: DeviceId,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dev_sn: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub position_id: Option<String>,
    /// `1` online, `0` offline.
    #[serde(default, deserialize_with = "opt_code")]
    pub connection_status: Option<i64>,
    /// Filled from the local last-seen cache, never by the backend.
    #[serde(default)]
    pub last_seen: Option<String>,
    /// `last_seen` as a relative age, e.g. "5 min ago".
    #[serde(default, skip_deserializing)]
    pub last_seen_text: Option<String>,
}

impl DeviceRecord {
    pub fn is_online(&self) -> bool {
        self.connection_status == Some(1)
    }
}

/// Filters and pagination of the device list. `status`: `0` offline, `1` online.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceQuery {
    pub name: Option<String>,
    pub dev_sn: Option<String>,
    pub status: Option<i64>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for DeviceQuery {
    fn default() -> Self {
        Self {
            name: None,
            dev_sn: None,
            status: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Add/edit form of a device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDraft {
    pub name: String,
    pub dev_sn: String,
    pub position_id: String,
}

impl DeviceDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::DeviceNameRequired);
        }
        if self.dev_sn.trim().is_empty() {
            return Err(ValidationError::DeviceSerialRequired);
        }
        if self.position_id.trim().is_empty() {
            return Err(ValidationError::PositionRequired);
        }
        Ok(())
    }
}

/// Result of checking a serial number before a replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SerialAvailability {
    NotFound,
    Unbound,
    Bound,
}

impl SerialAvailability {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Unbound,
            1 => Self::Bound,
            _ => Self::NotFound,
        }
    }

    /// Only an unbound device may replace another one.
    pub fn is_available(self) -> bool {
        self == Self::Unbound
    }
}

/// Building unit a device can be mounted at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Position {
    #[serde(deserialize_with = "crate::wire::string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DriverRecord {
        DriverRecord {
            name: "Tan Ah Kow".into(),
            card_no: "12345".into(),
            emp_no: "D-001".into(),
            job: None,
            department: DepartmentId::new("7"),
            gender: Gender::Male,
            phone: None,
        }
    }

    #[test]
    fn test_zero_card_rejected() {
        let mut r = record();
        r.card_no = "0000".into();
        assert_eq!(r.validate(), Err(ValidationError::CardNoZero));

        r.card_no = " 0 ".into();
        assert_eq!(r.validate(), Err(ValidationError::CardNoZero));
    }

    #[test]
    fn test_non_zero_card_accepted() {
        let mut r = record();
        assert!(r.validate().is_ok());

        r.card_no = "0001".into();
        assert!(r.validate().is_ok());
    }

    #[test]
    fn test_required_fields() {
        let mut r = record();
        r.card_no = "  ".into();
        assert_eq!(r.validate(), Err(ValidationError::CardNoRequired));

        let mut r = record();
        r.name = String::new();
        assert_eq!(r.validate(), Err(ValidationError::NameRequired));

        let mut r = record();
        r.emp_no = String::new();
        assert_eq!(r.validate(), Err(ValidationError::EmpNoRequired));

        let mut r = record();
        r.department = DepartmentId::new("");
        assert_eq!(r.validate(), Err(ValidationError::DepartmentRequired));
    }

    #[test]
    fn test_gender_wire_codes() {
        let g: Gender = serde_json::from_str("1").unwrap();
        assert_eq!(g, Gender::Female);
        let g: Gender = serde_json::from_str("\"0\"").unwrap();
        assert_eq!(g, Gender::Male);
        let g: Gender = serde_json::from_str("null").unwrap();
        assert_eq!(g, Gender::Unknown);
        assert_eq!(serde_json::to_string(&Gender::Unknown).unwrap(), "-1");
    }

    #[test]
    fn test_employee_row_accepts_loose_payload() {
        let json = r#"{
            "id": 901, "uuid": "D-001", "name": "Tan", "cardNo": 12345,
            "empNo": "D-001", "deptId": 7, "gender": "1", "phone": null
        }"#;
        let row: EmployeeRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.id, EmployeeId::new("901"));
        assert_eq!(row.card_no, "12345");
        assert_eq!(row.dept.as_deref(), Some("7"));
        assert_eq!(row.gender, Gender::Female);
        assert_eq!(row.phone, None);
    }

    #[test]
    fn test_page_query_filters_skip_blank() {
        let q = PageQuery {
            name: Some(" ".into()),
            card_no: Some("42".into()),
            ..PageQuery::default()
        };
        assert_eq!(q.filters(), vec![("cardNo", "42")]);
    }

    #[test]
    fn test_serial_availability() {
        assert!(SerialAvailability::from_code(0).is_available());
        assert!(!SerialAvailability::from_code(1).is_available());
        assert_eq!(SerialAvailability::from_code(-1), SerialAvailability::NotFound);
    }
}
