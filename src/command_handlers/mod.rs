pub mod add;
pub mod clean;
pub mod conf;
pub mod dispatch;
pub mod info;
pub mod list;
pub mod open;
pub mod remove;
