use crate::plugins::traits::{DeliveryReceipt, MessageChannel};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// Prints messages instead of delivering them. Used for dry runs.
#[derive(Default)]
pub struct StdoutChannel {
    sent: AtomicU64,
}

impl StdoutChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageChannel for StdoutChannel {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn send(&self, destination: &str, text: &str) -> Result<DeliveryReceipt> {
        let n = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        println!("--- message {} to {} ---\n{}\n", n, destination, text);
        Ok(DeliveryReceipt {
            message_id: Some(format!("stdout-{}", n)),
        })
    }

    async fn test_connection(&self, _destination: &str) -> Result<()> {
        Ok(())
    }
}
