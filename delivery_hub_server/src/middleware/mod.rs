mod signature;

pub use signature::{SignatureGateFactory, MAX_WEBHOOK_BODY_BYTES};
