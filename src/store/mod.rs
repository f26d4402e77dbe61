pub mod requests;

pub use requests::{newest_first, PartnerStats, RequestStore};
