pub mod dashboard;
pub mod documents;
pub mod flats;
pub mod maintenance;
pub mod payments;
pub mod settlement;
pub mod tenancies;

pub use dashboard::{FlatCard, OccupancyFilter};
pub use documents::DocumentService;
pub use flats::FlatService;
pub use maintenance::MaintenanceService;
pub use payments::PaymentService;
pub use settlement::SettlementService;
pub use tenancies::TenancyService;
