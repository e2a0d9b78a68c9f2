use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid site directory: {0}")]
    InvalidDirectory(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reasons a driver record is refused before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Employee Name is required")]
    NameRequired,

    #[error("Staff Pass ID is required")]
    CardNoRequired,

    #[error("Staff Pass ID cannot be zero")]
    CardNoZero,

    #[error("Driver ID is required")]
    EmpNoRequired,

    #[error("Department is required")]
    DepartmentRequired,

    #[error("Device name is required")]
    DeviceNameRequired,

    #[error("Serial number is required")]
    DeviceSerialRequired,

    #[error("Position / Building is required")]
    PositionRequired,
}
