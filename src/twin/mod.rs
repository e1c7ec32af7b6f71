pub mod models;
pub mod service;
pub mod store;

pub use models::{CuttingDocument, MachineStatus, NewCuttingData, Sample, TwinState};
pub use service::DigitalTwinService;
pub use store::{CuttingDataStore, CuttingQuery, InMemoryCuttingStore};
