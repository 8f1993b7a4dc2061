//! Embedded fallback prompts
//!
//! These are compiled into the binary and used when no override file exists.

pub const PLANNER_SYSTEM: &str = include_str!("../../prompts/planner-system.pmt");
pub const PLANNER_EXTRACT: &str = include_str!("../../prompts/planner-extract.pmt");
pub const COLLECTOR_SYSTEM: &str = include_str!("../../prompts/collector-system.pmt");
pub const CLARIFY: &str = include_str!("../../prompts/clarify.pmt");
pub const SEARCH_SYSTEM: &str = include_str!("../../prompts/search-system.pmt");
pub const SEARCH: &str = include_str!("../../prompts/search.pmt");
pub const ANALYZER_SYSTEM: &str = include_str!("../../prompts/analyzer-system.pmt");
pub const REPORT: &str = include_str!("../../prompts/report.pmt");

/// Look up an embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    match name {
        "planner-system" => Some(PLANNER_SYSTEM),
        "planner-extract" => Some(PLANNER_EXTRACT),
        "collector-system" => Some(COLLECTOR_SYSTEM),
        "clarify" => Some(CLARIFY),
        "search-system" => Some(SEARCH_SYSTEM),
        "search" => Some(SEARCH),
        "analyzer-system" => Some(ANALYZER_SYSTEM),
        "report" => Some(REPORT),
        _ => None,
    }
}
