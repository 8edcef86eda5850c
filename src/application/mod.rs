// Application layer - Use cases over the repository traits
pub mod dashboard_service;
pub mod performance_service;
pub mod series_service;
pub mod telemetry_repository;
pub mod tide_service;
pub mod track_service;
