//! Report tool implementations.
//!
//! - `guard`: SELECT-only allow-list check
//! - `limit`: LIMIT clause enforcement
//! - `shaper`: character-budget response shaping
//! - `report`: the two report tools built on the above

pub mod guard;
pub mod limit;
pub mod report;
pub mod shaper;

pub use guard::{FORBIDDEN_KEYWORDS, GuardRejection, validate_query};
pub use limit::enforce_limit;
pub use report::{ReportSettings, ReportToolHandler};
pub use shaper::{fit_rows, rendered_len, shape};
