pub mod node_repo;
pub mod tracking_repo;

pub use node_repo::NodeRepo;
pub use tracking_repo::TrackingRepo;
