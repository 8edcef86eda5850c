// Domain layer - Pure value types and math
pub mod geo;
pub mod polar;
pub mod station;
pub mod telemetry;
pub mod track;
pub mod units;
