mod config;
mod index;
mod search;
mod status;
mod suggest;

pub use config::ConfigCommand;
pub use index::IndexArgs;
pub use search::SearchArgs;
pub use suggest::SuggestArgs;

pub use config::handle_config;
pub use index::handle_index;
pub use search::handle_search;
pub use status::handle_status;
pub use suggest::handle_suggest;
