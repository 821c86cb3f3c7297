pub mod channel;

pub use channel::{DeliveryReceipt, MessageChannel, MessageFormat};
