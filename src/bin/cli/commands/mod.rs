pub mod cards;
pub mod history;
pub mod stats;
pub mod study;
