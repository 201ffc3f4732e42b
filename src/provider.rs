//! Provider contract re-exports used by `termchat`.

pub use chat_provider::{
    ChatProvider, Message, ProviderError, ProviderInitError, ProviderProfile, Role,
};
