pub mod client;
pub mod dispatch;
pub mod types;

pub use client::TelegramClient;
pub use dispatch::dispatch_all;
