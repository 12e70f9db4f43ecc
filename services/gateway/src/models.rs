//! Gateway models for upstream payloads and local request/response bodies

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Login request accepted by `POST /login`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
    pub user_level: String,
    pub verification_type: String,
    pub verification_url: String,
    /// Upstream session header to present on the login call itself
    pub session_id: String,
}

/// Body of `POST /courses/today`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoursesTodayRequest {
    pub date_str: String,
}

/// Query string of `GET /get_courses`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoursesQuery {
    pub date_str: String,
}

/// Body of `POST /api/sign-in`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignInRequest {
    pub time_table_id: String,
    /// Epoch milliseconds; zero means "now"
    pub timestamp: i64,
}

/// Top-level body returned by the upstream login call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginEnvelope {
    #[serde(rename = "STATUS")]
    pub status: String,
    pub download_type: String,
    pub smart_operation_ip: String,
    pub district_level_url: String,
    pub school_code: String,
    pub big_data_ip: String,
    pub player_type: String,
    pub calendar_type: String,
    pub video_down_type: String,
    pub user_org_name: String,
    pub if_hui_wu_person: String,
    pub cloud_auth: String,
    pub invite_flag: String,
    pub tencent_meeting: String,
    pub role_codes: String,
    pub role_names: String,
    #[serde(deserialize_with = "null_as_default")]
    pub result: UserInfo,
}

/// User profile returned by the upstream login call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub session_id: String,
    pub phone: String,
    pub user_name: String,
    pub nick_name: String,
    pub real_name: String,
    pub gender: String,
    pub user_level: String,
    pub pic_url: String,
    pub friend_auth: String,
    pub search_auth: String,
    pub note_auth: String,
    pub academy_id: String,
    pub academy_name: String,
    pub pri_subject: String,
    pub pri_subject_name: String,
    pub class_id: String,
    pub class_info_name: String,
    #[serde(rename = "classUUID")]
    pub class_uuid: String,
    #[serde(rename = "userUUID")]
    pub user_uuid: String,
    pub description: String,
    pub cloud_ip: String,
    pub cloud_flag: String,
    pub student_no: String,
}

/// Body returned by the upstream schedule call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleEnvelope {
    #[serde(rename = "STATUS")]
    pub status: String,
    pub total: String,
    #[serde(deserialize_with = "null_as_default")]
    pub result: Vec<CourseRecord>,
}

/// One scheduled class
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CourseRecord {
    pub id: String,
    pub uuid: String,
    pub course_id: String,
    pub course_name: String,
    pub course_type: String,
    pub week_day: String,
    pub course_num: String,
    pub semester_id: String,
    pub semester_name: String,
    pub teacher_id: String,
    pub teacher_name: String,
    pub teacher_pic_url: String,
    pub teacher_academy: String,
    pub classroom_id: String,
    pub classroom_uuid: String,
    pub classroom_name: String,
    pub classroom_longitude: String,
    pub classroom_latitude: String,
    pub teach_build_id: String,
    pub teach_build_uuid: String,
    pub teach_build_name: String,
    pub storey_id: String,
    pub storey_name: String,
    pub teach_time: String,
    pub sign_status: String,
    pub class_begin_time: String,
    pub evaluate_score: String,
    pub evaluate_status: String,
    pub sign_assistant_id: String,
    pub cloud_meeting_room_id: String,
    pub assistant_tea_name: String,
    pub assistant_stu_name: String,
    pub course_sched_type: String,
    pub class_end_time: String,
}

/// Response for login and profile lookups
#[derive(Debug, Serialize)]
pub struct UserResponse<T> {
    pub user: T,
}

/// Response for `POST /courses/today`
#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub result: Vec<CourseRecord>,
    /// Upstream clock minus local clock, in seconds
    pub delta: i64,
}

/// Response for the legacy `GET /get_courses`
#[derive(Debug, Serialize)]
pub struct LegacyScheduleResponse {
    /// "0" when classes were found, "2" when the day is empty
    #[serde(rename = "STATUS")]
    pub status: &'static str,
    pub delta: i64,
    pub result: Vec<CourseRecord>,
}

impl LegacyScheduleResponse {
    pub fn new(result: Vec<CourseRecord>, delta: i64) -> Self {
        let status = if result.is_empty() { "2" } else { "0" };
        Self {
            status,
            delta,
            result,
        }
    }
}

/// Health probe body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub sessions: usize,
}

/// Upstream occasionally sends `"result": null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Profile as stored alongside the session
pub fn profile_value(profile: &UserInfo) -> serde_json::Result<Value> {
    serde_json::to_value(profile)
}
