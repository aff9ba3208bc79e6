//! Query orchestration for the Gridsage assistant.
//!
//! Every question is routed to one of three strategies: a live carbon
//! intensity lookup, a grounded answer from the document index, or a plain
//! conversational reply.
//!
//! # Example
//! ```no_run
//! use gridsage_agent::{extract_when, WhenExpr};
//!
//! let now = chrono::Utc::now().naive_utc();
//! assert!(matches!(extract_when("intensity tomorrow at 7am", now), WhenExpr::At(_)));
//! ```

pub mod orchestrator;
pub mod route;
pub mod tools;
pub mod when;

pub use orchestrator::{tag_hint_for, Answer, Orchestrator, TOOL_NO_VALUE_MESSAGE};
pub use route::{LlmRouter, QueryRouter, Route};
pub use tools::{half_hour_window, CarbonIntensityTool, LiveDataTool, ToolReading};
pub use when::{extract_when, WhenExpr};
