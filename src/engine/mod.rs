pub mod items;
pub mod lifecycle;
pub mod pickup_code;
pub mod schedule;
pub mod transition;
