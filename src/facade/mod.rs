pub mod async_service;
pub mod service;

pub use async_service::AsyncAllocationService;
pub use service::AllocationService;
