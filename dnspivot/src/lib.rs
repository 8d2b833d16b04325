pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    WordlistSource, create_configuration_assets, discovery_options_from_args,
    installed_wordlist_path, load_words_from_source, resolve_wordlist_source,
};
