pub mod add;
pub mod adj_actions;
pub mod overview;
pub mod progress;
pub mod questions;
pub mod views;
