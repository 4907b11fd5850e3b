pub mod capture;
pub mod export;
pub mod rank;
pub mod store;
pub mod tags;
pub mod util;

pub use capture::*;
pub use export::*;
pub use rank::*;
pub use store::*;
pub use tags::*;
pub use util::*;
