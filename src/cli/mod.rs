pub mod add;
pub mod day;
pub mod month;
pub mod rates;
pub mod setup;
pub mod ui;
