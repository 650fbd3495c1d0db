//! Enumeration types for the service desk.
//!
//! Wire strings match what the staff dashboard renders (`"In Progress"`,
//! `"No-Show"`), so the status enums carry explicit serde renames and a
//! [`FromStr`](core::str::FromStr) used for query strings and database
//! columns. [`Role`] uses lowercase names on the wire and in storage.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Queue status
// ---------------------------------------------------------------------------

/// Lifecycle status of a queue entry.
///
/// Only [`QueueStatus::Waiting`] entries take part in position numbering.
/// `Completed` and `Cancelled` are terminal in the sense that they no longer
/// hold a place in line, though staff may still move them back.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum QueueStatus {
    /// In line and counted for position.
    #[default]
    Waiting,
    /// Currently being served at the desk.
    #[serde(rename = "In Progress", alias = "InProgress")]
    InProgress,
    /// Service finished.
    Completed,
    /// Student left or staff cancelled the slot.
    Cancelled,
}

impl QueueStatus {
    /// Every status, in dashboard display order.
    pub const ALL: [Self; 4] = [
        Self::Waiting,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
    ];

    /// The wire representation of this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "Waiting",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether the entry no longer holds a place in line.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the entry participates in position numbering.
    pub const fn is_waiting(self) -> bool {
        matches!(self, Self::Waiting)
    }
}

impl core::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for QueueStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Waiting" => Ok(Self::Waiting),
            "In Progress" | "InProgress" => Ok(Self::InProgress),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Appointment status
// ---------------------------------------------------------------------------

/// Status of a booked appointment. Staff move it by hand; it never
/// transitions on its own.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum AppointmentStatus {
    /// Created by the student, not yet acknowledged.
    #[default]
    Booked,
    /// Acknowledged by staff.
    Confirmed,
    /// Appointment took place.
    Completed,
    /// Cancelled by either side.
    Cancelled,
    /// Student did not turn up.
    #[serde(rename = "No-Show", alias = "NoShow")]
    NoShow,
}

impl AppointmentStatus {
    /// The wire representation of this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Booked => "Booked",
            Self::Confirmed => "Confirmed",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::NoShow => "No-Show",
        }
    }
}

impl core::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for AppointmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Booked" => Ok(Self::Booked),
            "Confirmed" => Ok(Self::Confirmed),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            "No-Show" | "NoShow" => Ok(Self::NoShow),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// What an authenticated caller may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Role {
    /// Joins the queue, books appointments, and manages their own slot.
    Student,
    /// Sees and manages everything.
    Staff,
}

impl Role {
    /// Lowercase wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Staff => "staff",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "student" => Ok(Self::Student),
            "staff" => Ok(Self::Staff),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

/// A status or role string that matches no known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl core::fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown status: {:?}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}
