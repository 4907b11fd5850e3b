#[cfg(feature = "capstone-backend")]
pub mod capstone;
pub mod synthetic;

#[cfg(feature = "capstone-backend")]
pub use capstone::CapstoneHost;
pub use synthetic::SyntheticBinary;
