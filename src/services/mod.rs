pub mod onramp_client;
pub mod page_store;

pub use onramp_client::OnRampClient;
pub use page_store::PageStore;
