//! Delivery performance analytics: normalizes raw delivery export rows,
//! computes KPIs per depot, carrier and driver, ranks them, scores customer
//! comments and synthesizes strengths and weaknesses against objectives.

pub mod aggregate;
pub mod config;
pub mod import;
pub mod lookup;
pub mod normalize;
pub mod output;
pub mod ranking;
pub mod reports;
pub mod sentiment;
pub mod synthesis;
pub mod types;
pub mod util;
