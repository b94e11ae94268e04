pub mod core;
pub mod dataset;
pub mod generation;
pub mod llm;
pub mod normalize;
pub mod pipeline;
pub mod rag;
pub mod server;
pub mod session;
pub mod state;
