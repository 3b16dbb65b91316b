pub mod calc;
pub mod models;
pub mod orientation;
