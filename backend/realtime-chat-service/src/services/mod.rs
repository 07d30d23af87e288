pub mod call_service;
pub mod conversation_service;
pub mod e2ee;
pub mod e2ee_message_service;
pub mod encryption;
pub mod graph_client;
pub mod key_exchange;
pub mod location_service;
pub mod megolm_service;
pub mod message_service;
pub mod offline_queue;
pub mod olm_service;
pub mod relationship_service;
pub mod signal_service;

// Re-export key types for convenience
pub use e2ee_message_service::{
    E2eeMessage, E2eeMessageError, E2eeMessageService, SendE2eeMessageRequest,
};
pub use graph_client::GraphClient;
pub use megolm_service::{MegolmCiphertext, MegolmError, MegolmService, RoomKey};
pub use olm_service::{AccountEncryptionKey, DeviceKeys, OlmError, OlmService};
pub use relationship_service::{
    CanMessageResult, RelationshipService, RelationshipServiceV2, RelationshipStatus,
};
pub use signal_service::{
    KyberPreKey, PreKey, PreKeyBundle, SignalDevice, SignalError, SignalService, SignedPreKey,
};
