pub mod executor;
pub mod mock;
pub mod selector;
pub mod types;

pub use executor::{resolve_url, run_scenario, run_scenario_with};
pub use mock::{DialogResponse, MockConfig, MockLog, MockResponse, MockRule, PageInit};
pub use selector::{Selector, Target};
pub use types::{HarnessError, HarnessResult, RunOptions, Scenario, Step};
