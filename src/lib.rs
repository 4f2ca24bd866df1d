//! Conversation tree visualization engine
//!
//! Turns snapshots of a branching multi-agent conversation into an animated,
//! pannable tree inside an egui UI. See [`tree`] for the pipeline and
//! [`config`] for tunables.

pub mod config;
pub mod tree;

pub use config::{global_config, TreeSettings};
pub use tree::{
    ConversationTreeEngine, ConversationTreeWidget, RawNode, TreeError, TreeResult, TreeSnapshot,
    TreeState, ViewportSize,
};
