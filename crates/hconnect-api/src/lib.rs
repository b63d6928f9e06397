// hconnect-api: Async Rust client for the BSH Home Connect cloud API

pub mod appliances;
pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod programs;
pub mod transport;

pub use appliances::ApplianceHandle;
pub use auth::{OAUTH2_AUTHORIZE, OAUTH2_TOKEN, OAuthApp, Token, TokenSource};
pub use client::{API_URL, HomeConnectClient, SIMULATOR_URL};
pub use error::Error;
pub use models::{HomeAppliance, OptionValue, Program, ProgramOption, StateItem};
pub use programs::{BSH_PAUSE, BSH_RESUME};
pub use transport::{TlsMode, TransportConfig};
