mod client;
mod token_store;

pub use client::{ApiClient, ApiError, AuthApi, ProfileApi};
pub use token_store::{
    FileTokenStore, MemoryTokenStore, TokenStore, TokenStoreError, TokenWrite, TOKEN_KEY,
};
