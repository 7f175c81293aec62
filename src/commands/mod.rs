pub mod apply;
pub mod delete;
pub mod status;
pub mod wait;
