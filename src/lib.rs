//! Thin async client for the Telegram Bot HTTP API.
//!
//! [`Client`] wraps the one-shot operations (messages, chats, files, sign-in);
//! [`UpdatePoller`] long-polls `getUpdates` and feeds matching messages to
//! [`Listener`]s. Both talk to Telegram through the [`BotApi`] trait, with
//! [`HttpTransport`] as the reqwest implementation.

pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod poller;
pub mod transport;
pub mod types;

pub use client::{Client, Credentials};
pub use config::Config;
pub use error::{ApiError, Result};
pub use poller::{Filter, Listener, PollHandle, PollOutcome, PollState, UpdatePoller};
pub use transport::{BotApi, HttpTransport, InputFile, Params};
pub use types::{Chat, ChatEntity, File, Message, Update, User};
