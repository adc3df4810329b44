pub mod entities;
pub mod read_tracking;
pub mod requests;
pub mod responses;
