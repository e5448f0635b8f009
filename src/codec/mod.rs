//! PatrolDevice message codec.
//!
//! Maps between XML bodies and typed message values. Outbound requests are
//! built with [`Request::encode`]; inbound bodies are parsed with
//! [`decode_response`] into a [`Response`] tagged by [`MessageType`], so
//! the dispatcher can verify the tag without any run-time casting.
//!
//! Recognized `<Type>` values:
//!
//! | Type | Meaning                |
//! |------|------------------------|
//! | 1002 | Runtime status         |
//! | 1003 | Start navigation task  |
//! | 1004 | Cancel task            |
//! | 1007 | Query task status      |
//!
//! Request and response share the `<Type>` value; direction is decided by
//! context (the SDK only ever decodes responses).

mod xml;

use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;

use crate::error::{Result, SdkError};
use crate::types::{wire_timestamp, NavigationPoint, RealTimeStatus};

use xml::{get_f64, get_i32, get_u64, PatrolDoc};

/// Message kind tag. One per request kind and one per response kind, plus
/// [`MessageType::Unknown`] for unrecognized `<Type>` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    GetRealTimeStatusReq,
    GetRealTimeStatusResp,
    NavigationTaskReq,
    NavigationTaskResp,
    CancelTaskReq,
    CancelTaskResp,
    QueryStatusReq,
    QueryStatusResp,
    Unknown,
}

impl MessageType {
    /// The wire `<Type>` value for this kind.
    pub fn type_code(self) -> u16 {
        match self {
            MessageType::GetRealTimeStatusReq | MessageType::GetRealTimeStatusResp => 1002,
            MessageType::NavigationTaskReq | MessageType::NavigationTaskResp => 1003,
            MessageType::CancelTaskReq | MessageType::CancelTaskResp => 1004,
            MessageType::QueryStatusReq | MessageType::QueryStatusResp => 1007,
            MessageType::Unknown => 0,
        }
    }

    /// Map an inbound `<Type>` value to its response kind.
    pub fn response_from_code(code: u16) -> Self {
        match code {
            1002 => MessageType::GetRealTimeStatusResp,
            1003 => MessageType::NavigationTaskResp,
            1004 => MessageType::CancelTaskResp,
            1007 => MessageType::QueryStatusResp,
            _ => MessageType::Unknown,
        }
    }
}

/// An outbound request body.
#[derive(Debug, Clone)]
pub enum Request {
    GetRealTimeStatus,
    NavigationTask { points: Vec<NavigationPoint> },
    CancelTask,
    QueryStatus,
}

impl Request {
    /// The kind of this request.
    pub fn message_type(&self) -> MessageType {
        match self {
            Request::GetRealTimeStatus => MessageType::GetRealTimeStatusReq,
            Request::NavigationTask { .. } => MessageType::NavigationTaskReq,
            Request::CancelTask => MessageType::CancelTaskReq,
            Request::QueryStatus => MessageType::QueryStatusReq,
        }
    }

    /// The response kind this request expects.
    pub fn expected_response(&self) -> MessageType {
        match self {
            Request::GetRealTimeStatus => MessageType::GetRealTimeStatusResp,
            Request::NavigationTask { .. } => MessageType::NavigationTaskResp,
            Request::CancelTask => MessageType::CancelTaskResp,
            Request::QueryStatus => MessageType::QueryStatusResp,
        }
    }

    /// Serialize to the `<PatrolDevice>` document, stamped with the
    /// current local time.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.encode_at(&wire_timestamp())
    }

    fn encode_at(&self, time: &str) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let type_code = self.message_type().type_code().to_string();
        writer
            .create_element("PatrolDevice")
            .write_inner_content::<_, quick_xml::Error>(|w| {
                write_text(w, "Type", &type_code)?;
                write_text(w, "Command", "1")?;
                write_text(w, "Time", time)?;
                match self {
                    Request::NavigationTask { points } => {
                        for point in points {
                            w.create_element("Items").write_inner_content::<_, quick_xml::Error>(|w| {
                                write_text(w, "MapID", &point.map_id.to_string())?;
                                write_text(w, "Value", &point.value.to_string())?;
                                write_text(w, "PosX", &point.pos_x.to_string())?;
                                write_text(w, "PosY", &point.pos_y.to_string())?;
                                write_text(w, "PosZ", &point.pos_z.to_string())?;
                                write_text(w, "AngleYaw", &point.angle_yaw.to_string())?;
                                write_text(w, "PointInfo", &point.point_info.to_string())?;
                                write_text(w, "Gait", &point.gait.to_string())?;
                                write_text(w, "Speed", &point.speed.to_string())?;
                                write_text(w, "Manner", &point.manner.to_string())?;
                                write_text(w, "ObsMode", &point.obs_mode.to_string())?;
                                write_text(w, "NavMode", &point.nav_mode.to_string())?;
                                write_text(w, "Terrain", &point.terrain.to_string())?;
                                write_text(w, "Posture", &point.posture.to_string())?;
                                Ok(())
                            })?;
                        }
                    }
                    _ => {
                        w.create_element("Items").write_empty()?;
                    }
                }
                Ok(())
            })?;

        Ok(writer.into_inner())
    }
}

fn write_text<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> std::result::Result<(), quick_xml::Error> {
    writer
        .create_element(name)
        .write_text_content(BytesText::new(value))?;
    Ok(())
}

/// Items of a navigation task response (type 1003).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavTaskItems {
    /// Target point number, echoed from the request.
    pub value: i32,
    /// Raw `<ErrorCode>`: 0 success, 1 failure, 2 cancelled.
    pub error_code: i32,
    /// Raw `<ErrorStatus>`: detailed reason, passed through unchanged.
    pub error_status: i32,
}

/// Items of a cancel task response (type 1004).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CancelTaskItems {
    /// Raw `<ErrorCode>`: 0 success, 1 failure.
    pub error_code: i32,
}

/// Items of a task status query response (type 1007).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryStatusItems {
    /// Target point number of the reported task.
    pub value: i32,
    /// Raw `<Status>`: 0 completed, 1 executing, -1 failed.
    pub status: i32,
    /// Raw `<ErrorCode>`, mirroring `<Status>`.
    pub error_code: i32,
}

/// A decoded inbound response body.
#[derive(Debug, Clone)]
pub enum Response {
    RealTimeStatus(Box<RealTimeStatus>),
    NavigationTask(NavTaskItems),
    CancelTask(CancelTaskItems),
    QueryStatus(QueryStatusItems),
}

impl Response {
    /// The kind tag of this response.
    pub fn message_type(&self) -> MessageType {
        match self {
            Response::RealTimeStatus(_) => MessageType::GetRealTimeStatusResp,
            Response::NavigationTask(_) => MessageType::NavigationTaskResp,
            Response::CancelTask(_) => MessageType::CancelTaskResp,
            Response::QueryStatus(_) => MessageType::QueryStatusResp,
        }
    }
}

/// Decode an inbound body into a typed response.
///
/// # Errors
///
/// [`SdkError::InvalidResponse`] for malformed documents, unrecognized
/// `<Type>` values, and response types whose `<Items>` payload is missing.
/// The caller logs and drops such bodies; they never tear the stream down.
pub fn decode_response(body: &[u8]) -> Result<Response> {
    let doc = PatrolDoc::parse(body)?;

    match MessageType::response_from_code(doc.type_code) {
        MessageType::GetRealTimeStatusResp => {
            let item = doc.first_item().ok_or(SdkError::InvalidResponse)?;
            let status = RealTimeStatus {
                motion_state: get_i32(item, "MotionState"),
                pos_x: get_f64(item, "PosX"),
                pos_y: get_f64(item, "PosY"),
                pos_z: get_f64(item, "PosZ"),
                angle_yaw: get_f64(item, "AngleYaw"),
                roll: get_f64(item, "Roll"),
                pitch: get_f64(item, "Pitch"),
                yaw: get_f64(item, "Yaw"),
                speed: get_f64(item, "Speed"),
                cur_odom: get_f64(item, "CurOdom"),
                sum_odom: get_f64(item, "SumOdom"),
                cur_runtime: get_u64(item, "CurRuntime"),
                sum_runtime: get_u64(item, "SumRuntime"),
                res: get_f64(item, "Res"),
                x0: get_f64(item, "X0"),
                y0: get_f64(item, "Y0"),
                h: get_i32(item, "H"),
                electricity: get_i32(item, "Electricity"),
                location: get_i32(item, "Location"),
                rtk_state: get_i32(item, "RTKState"),
                on_dock_state: get_i32(item, "OnDockState"),
                gait_state: get_i32(item, "GaitState"),
                motor_state: get_i32(item, "MotorState"),
                charge_state: get_i32(item, "ChargeState"),
                control_mode: get_i32(item, "ControlMode"),
                map_update_state: get_i32(item, "MapUpdateState"),
                timestamp: doc.time.clone(),
            };
            Ok(Response::RealTimeStatus(Box::new(status)))
        }
        MessageType::NavigationTaskResp => {
            let item = doc.first_item().ok_or(SdkError::InvalidResponse)?;
            Ok(Response::NavigationTask(NavTaskItems {
                value: get_i32(item, "Value"),
                error_code: get_i32(item, "ErrorCode"),
                error_status: get_i32(item, "ErrorStatus"),
            }))
        }
        MessageType::CancelTaskResp => {
            let item = doc.first_item().ok_or(SdkError::InvalidResponse)?;
            Ok(Response::CancelTask(CancelTaskItems {
                error_code: get_i32(item, "ErrorCode"),
            }))
        }
        MessageType::QueryStatusResp => {
            let item = doc.first_item().ok_or(SdkError::InvalidResponse)?;
            Ok(Response::QueryStatus(QueryStatusItems {
                value: get_i32(item, "Value"),
                status: get_i32(item, "Status"),
                error_code: get_i32(item, "ErrorCode"),
            }))
        }
        _ => {
            tracing::debug!(type_code = doc.type_code, "unrecognized message type");
            Err(SdkError::InvalidResponse)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_body(type_code: u16, items: &str) -> Vec<u8> {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <PatrolDevice>\n\
             <Type>{type_code}</Type>\n\
             <Command>1</Command>\n\
             <Time>2024-05-06 07:08:09</Time>\n\
             <Items>{items}</Items>\n\
             </PatrolDevice>"
        )
        .into_bytes()
    }

    #[test]
    fn status_request_document_shape() {
        let body = Request::GetRealTimeStatus.encode_at("2024-01-01 00:00:00").unwrap();
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(text.contains("<PatrolDevice>"));
        assert!(text.contains("<Type>1002</Type>"));
        assert!(text.contains("<Command>1</Command>"));
        assert!(text.contains("<Time>2024-01-01 00:00:00</Time>"));
        assert!(text.contains("<Items/>"));
    }

    #[test]
    fn request_type_codes() {
        assert_eq!(Request::GetRealTimeStatus.message_type().type_code(), 1002);
        assert_eq!(
            Request::NavigationTask { points: vec![] }.message_type().type_code(),
            1003
        );
        assert_eq!(Request::CancelTask.message_type().type_code(), 1004);
        assert_eq!(Request::QueryStatus.message_type().type_code(), 1007);
    }

    #[test]
    fn nav_request_carries_points() {
        let points = vec![
            NavigationPoint {
                map_id: 1,
                value: 7,
                pos_x: 1.5,
                angle_yaw: 90.0,
                ..Default::default()
            },
            NavigationPoint {
                map_id: 1,
                value: 8,
                pos_x: -3.25,
                ..Default::default()
            },
        ];
        let body = Request::NavigationTask { points }.encode().unwrap();

        // The document must be readable back by the shared parser.
        let doc = xml::PatrolDoc::parse(&body).unwrap();
        assert_eq!(doc.type_code, 1003);
        assert_eq!(doc.items.len(), 2);
        assert_eq!(get_i32(&doc.items[0], "Value"), 7);
        assert_eq!(get_f64(&doc.items[0], "PosX"), 1.5);
        assert_eq!(get_f64(&doc.items[0], "AngleYaw"), 90.0);
        assert_eq!(get_i32(&doc.items[1], "Value"), 8);
        assert_eq!(get_f64(&doc.items[1], "PosX"), -3.25);
    }

    #[test]
    fn decode_runtime_status() {
        let body = response_body(
            1002,
            "<MotionState>2</MotionState><PosX>1.25</PosX><PosY>-0.5</PosY>\
             <Speed>0.8</Speed><CurRuntime>120</CurRuntime><SumRuntime>99999</SumRuntime>\
             <Electricity>73</Electricity><Location>0</Location><ChargeState>1</ChargeState>",
        );

        let resp = decode_response(&body).unwrap();
        assert_eq!(resp.message_type(), MessageType::GetRealTimeStatusResp);
        let Response::RealTimeStatus(status) = resp else {
            panic!("wrong variant");
        };
        assert_eq!(status.motion_state, 2);
        assert_eq!(status.pos_x, 1.25);
        assert_eq!(status.pos_y, -0.5);
        assert_eq!(status.speed, 0.8);
        assert_eq!(status.cur_runtime, 120);
        assert_eq!(status.sum_runtime, 99999);
        assert_eq!(status.electricity, 73);
        assert_eq!(status.charge_state, 1);
        // Fields the server omitted fall back to zero.
        assert_eq!(status.rtk_state, 0);
        assert_eq!(status.timestamp, "2024-05-06 07:08:09");
    }

    #[test]
    fn decode_nav_task_response() {
        let body = response_body(
            1003,
            "<Value>3</Value><ErrorCode>2</ErrorCode><ErrorStatus>1007</ErrorStatus>",
        );

        let Response::NavigationTask(items) = decode_response(&body).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(items.value, 3);
        assert_eq!(items.error_code, 2);
        assert_eq!(items.error_status, 1007);
    }

    #[test]
    fn decode_cancel_response() {
        let body = response_body(1004, "<ErrorCode>0</ErrorCode>");
        let Response::CancelTask(items) = decode_response(&body).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(items.error_code, 0);
    }

    #[test]
    fn decode_query_status_response() {
        let body = response_body(1007, "<Value>5</Value><Status>-1</Status><ErrorCode>-1</ErrorCode>");
        let Response::QueryStatus(items) = decode_response(&body).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(items.value, 5);
        assert_eq!(items.status, -1);
        assert_eq!(items.error_code, -1);
    }

    #[test]
    fn decode_unknown_type_rejected() {
        let body = response_body(9999, "<ErrorCode>0</ErrorCode>");
        assert!(decode_response(&body).is_err());
    }

    #[test]
    fn decode_missing_items_rejected() {
        let body = b"<PatrolDevice><Type>1004</Type><Command>1</Command><Time>t</Time></PatrolDevice>";
        assert!(decode_response(body).is_err());
    }

    #[test]
    fn decode_malformed_body_rejected() {
        assert!(decode_response(b"<PatrolDevice><Type>").is_err());
        assert!(decode_response(b"garbage").is_err());
    }

    #[test]
    fn response_kind_mapping() {
        assert_eq!(
            MessageType::response_from_code(1002),
            MessageType::GetRealTimeStatusResp
        );
        assert_eq!(
            MessageType::response_from_code(1007),
            MessageType::QueryStatusResp
        );
        assert_eq!(MessageType::response_from_code(42), MessageType::Unknown);
    }
}
