pub mod config;
pub mod directory;
pub mod error;
pub mod handler;
pub mod service;

pub use config::{
    BroadcastSettings, NotificationSettings, RelayCliFlags, RelayConfig,
    default_relay_config_path,
};
pub use directory::{ChannelMember, Directory, InMemoryDirectory, Preference, PreferenceStore};
pub use error::{DeliveryFailure, DispatchError, NotifyError};
pub use handler::{DispatchReport, MentionHandler};
pub use service::{
    LogRouter, NotificationService, ServiceRouter, mention_notification_text, parse_service_urls,
    preview_message,
};
