pub mod plan;
pub mod rate;
pub mod serve;
pub mod setup;
pub mod ui;
