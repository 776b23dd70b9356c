pub mod evolution;
pub mod traits;

pub use evolution::{EvolutionClient, NormalizeError, normalize};
pub use traits::{OutboundGateway, SendError};
