pub mod event;
pub mod identity;
pub mod pickup;
