//! Tether Core Library
//!
//! Device-linking and provisioning protocol core: introduces a new device
//! to an existing account over an encrypted one-shot envelope, tracks and
//! renames linked devices, and coordinates the optional post-link backup
//! transfer. Cryptographic primitives use the audited `ring` crate plus
//! X25519 key agreement.

pub mod channel;
pub mod crypto;
pub mod devices;
#[cfg(feature = "link-and-sync")]
pub mod linksync;
pub mod provisioning;
pub mod storage;
pub mod wire;

pub use channel::{
    ChannelError, ChannelEvent, ChannelState, FrameTransport, MockFrameTransport,
    ProvisioningChannel, HEARTBEAT_INTERVAL,
};
#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
pub use channel::{WebSocketFrameTransport, WebSocketTransportConfig};
pub use crypto::{
    decrypt_device_name, encrypt_device_name, AgreementKeyPair, EncryptedEnvelope, EnvelopeError,
    IdentityKeyPair, NameCipherError,
};
pub use devices::{
    ActivityWindow, DecryptedDevice, DeviceActivityTracker, DeviceApi, DeviceApiError,
    DeviceLifecyclePolicy, DeviceListRefresher, DeviceManagerError, InactiveLinkedDevice,
    LinkedDeviceManager, LinkedDeviceRecord, MostRecentlyLinked, RefreshOutcome,
    PRIMARY_DEVICE_ID, REFRESH_INTERVAL,
};
#[cfg(feature = "http-api")]
pub use devices::{HttpApiConfig, HttpDeviceApi};
#[cfg(feature = "link-and-sync")]
pub use linksync::{
    ArchiveLocation, BackupError, BackupProducer, BackupRestorer, LinkAndSyncCoordinator,
    LinkSyncTimeouts, LinkingApi, LinkingApiError, PrimaryLinkSyncError, SecondaryLinkSyncError,
};
#[cfg(feature = "http-api")]
pub use linksync::HttpLinkingApi;
pub use provisioning::{
    AccountEntropyPool, EphemeralBackupKey, LinkingCodec, MasterKey, ProvisioningError,
    ProvisioningPayload, RegistrationCodec, RegistrationPayload, RootKeyMaterial,
};
pub use storage::{
    DeviceStore, InMemoryDeviceStore, InMemoryKeyValueStore, KeyValueStore, SqliteDeviceStore,
    SqliteKeyValueStore, StorageError,
};
