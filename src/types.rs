//! User-facing data model.
//!
//! These are the types that cross the API boundary: waypoints going in,
//! telemetry and task results coming out, and the SDK configuration.
//! Wire-level raw integers are converted into these types by the client
//! facade; nothing here touches the socket.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SdkError};

/// Operation result code, shared by the navigation callback and the task
/// status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorCode {
    /// Operation succeeded.
    #[default]
    Success,
    /// Operation failed.
    Failure,
    /// Operation was cancelled.
    Cancelled,
    /// Operation timed out.
    Timeout,
    /// Invalid parameter.
    InvalidParam,
    /// Not connected.
    NotConnected,
    /// Network error.
    NetworkError,
}

impl ErrorCode {
    /// Map a wire `<ErrorCode>` value. Unrecognized values are treated as
    /// failures rather than rejected.
    pub fn from_wire(value: i32) -> Self {
        match value {
            0 => ErrorCode::Success,
            2 => ErrorCode::Cancelled,
            _ => ErrorCode::Failure,
        }
    }
}

/// State of a navigation task as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationStatus {
    /// Task has completed.
    #[default]
    Completed,
    /// Task is still executing.
    Executing,
    /// Task failed.
    Failed,
}

impl NavigationStatus {
    /// Map a wire `<Status>` value (0 completed, 1 executing, -1 failed).
    pub fn from_wire(value: i32) -> Result<Self> {
        match value {
            0 => Ok(NavigationStatus::Completed),
            1 => Ok(NavigationStatus::Executing),
            -1 => Ok(NavigationStatus::Failed),
            _ => Err(SdkError::InvalidResponse),
        }
    }
}

/// A single waypoint of a navigation task.
///
/// Serde field names follow the wire spelling so waypoint lists can be
/// loaded directly from the JSON files the robot tooling produces.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NavigationPoint {
    /// Map the waypoint belongs to.
    #[serde(rename = "MapID", default)]
    pub map_id: i32,
    /// Target point number, echoed back in the task result.
    #[serde(rename = "Value", default)]
    pub value: i32,
    #[serde(rename = "PosX", default)]
    pub pos_x: f64,
    #[serde(rename = "PosY", default)]
    pub pos_y: f64,
    #[serde(rename = "PosZ", default)]
    pub pos_z: f64,
    /// Heading at the waypoint, degrees.
    #[serde(rename = "AngleYaw", default)]
    pub angle_yaw: f64,
    #[serde(rename = "PointInfo", default)]
    pub point_info: i32,
    /// Gait selection.
    #[serde(rename = "Gait", default)]
    pub gait: i32,
    #[serde(rename = "Speed", default)]
    pub speed: i32,
    #[serde(rename = "Manner", default)]
    pub manner: i32,
    /// Obstacle-avoidance mode.
    #[serde(rename = "ObsMode", default)]
    pub obs_mode: i32,
    #[serde(rename = "NavMode", default)]
    pub nav_mode: i32,
    #[serde(rename = "Terrain", default)]
    pub terrain: i32,
    #[serde(rename = "Posture", default)]
    pub posture: i32,
}

impl NavigationPoint {
    /// Load a waypoint list from a JSON array document.
    pub fn points_from_json(data: &str) -> Result<Vec<NavigationPoint>> {
        serde_json::from_str(data).map_err(|e| {
            tracing::debug!(cause = %e, "waypoint JSON rejected");
            SdkError::InvalidParam("invalid waypoint JSON")
        })
    }
}

/// Real-time telemetry snapshot of the robot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RealTimeStatus {
    /// Motion state flag.
    pub motion_state: i32,
    pub pos_x: f64,
    pub pos_y: f64,
    pub pos_z: f64,
    pub angle_yaw: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub speed: f64,
    /// Odometer distance of the current run.
    pub cur_odom: f64,
    /// Lifetime odometer distance.
    pub sum_odom: f64,
    /// Runtime of the current session, seconds.
    pub cur_runtime: u64,
    /// Lifetime runtime, seconds.
    pub sum_runtime: u64,
    pub res: f64,
    pub x0: f64,
    pub y0: f64,
    pub h: i32,
    /// Battery charge, percent.
    pub electricity: i32,
    /// Localization state: 0 = localized, 1 = lost.
    pub location: i32,
    pub rtk_state: i32,
    pub on_dock_state: i32,
    pub gait_state: i32,
    pub motor_state: i32,
    pub charge_state: i32,
    pub control_mode: i32,
    pub map_update_state: i32,
    /// Server-reported timestamp, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
}

/// Result of a navigation task, delivered through the start callback.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavigationResult {
    /// Target point number, matching the request's waypoint.
    pub value: i32,
    /// Coarse outcome.
    pub error_code: ErrorCode,
    /// Detailed server-side reason, passed through without interpretation
    /// (motion fault, low battery, localization lost, ...).
    pub error_status: i32,
    /// Local timestamp at which the result was produced.
    pub timestamp: String,
}

/// Result of a task status query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskStatusResult {
    /// Target point number of the task being reported on.
    pub value: i32,
    /// Task state.
    pub status: NavigationStatus,
    /// Raw `<ErrorCode>` of the response; mirrors the status and carries
    /// transport-level variants. Passed through unchanged.
    pub error_code: i32,
    /// Local timestamp at which the result was produced.
    pub timestamp: String,
}

/// Callback invoked with the outcome of a navigation task.
pub type NavigationResultCallback = Box<dyn FnOnce(NavigationResult) + Send + 'static>;

/// SDK configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdkOptions {
    /// Bound on TCP connection establishment.
    pub connect_timeout: Duration,
    /// Bound on each blocking request/response exchange.
    pub request_timeout: Duration,
}

impl Default for SdkOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(5000),
            request_timeout: Duration::from_millis(3000),
        }
    }
}

/// Current local time in the wire format (`YYYY-MM-DD HH:MM:SS`).
pub(crate) fn wire_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
