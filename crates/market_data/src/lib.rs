pub mod remote;
pub mod traits;

pub use remote::{KucoinClient, PriceError};
pub use traits::PriceSource;
