//! # deskflow-rag
//!
//! Retrieval-augmented generation: a [`VectorIndex`] abstraction with a
//! Pinecone-style HTTP implementation, and a self-correcting query graph
//! (`rewrite → retrieve → grade → generate`) that rewrites poor queries and
//! fails open to generation once the rewrite budget is spent.

pub mod graph;
pub mod index;
pub mod tool;

pub use graph::{RagConfig, build_rag_graph};
pub use index::{PineconeIndex, RetrievedDoc, VectorIndex};
pub use tool::rag_search_tool;
