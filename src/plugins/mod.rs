pub mod notifiers;
pub mod traits;

pub use notifiers::build_channel;
pub use traits::{DeliveryReceipt, MessageChannel, MessageFormat};
