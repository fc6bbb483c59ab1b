use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One clock-in/clock-out mark as read from an uploaded `DATA.TXT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "2023/10/15")]
    pub date: String,

    #[schema(example = "08:00")]
    pub time: String,

    #[schema(example = "12345678-9")]
    pub person_id: String,
}

/// A validated line waiting for the store to assign it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendance {
    pub date: String,
    pub time: String,
    pub person_id: String,
}

impl NewAttendance {
    pub fn with_id(self, id: u64) -> AttendanceRecord {
        AttendanceRecord {
            id,
            date: self.date,
            time: self.time,
            person_id: self.person_id,
        }
    }
}
