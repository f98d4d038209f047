//! Output generation for the analysis response and on-disk reports.
//!
//! # Submodules
//!
//! - [`json`]: The `{"results": [...]}` response, structured errors, and batch files
//! - [`markdown`]: A readable report with summary metrics and one card per article
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     └── finance_143012.json
//!
//! markdown_output_dir/
//! └── 2025-05-06_finance_143012.md
//! ```

pub mod json;
pub mod markdown;
