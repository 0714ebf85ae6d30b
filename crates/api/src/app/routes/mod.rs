pub mod attendance;
pub mod system;
pub mod timetable;
