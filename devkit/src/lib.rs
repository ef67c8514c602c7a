/*!
# Beat DevKit - Fixtures and test helpers for the exporter

Lets tests run without a live beat:
- JSON builders for `/` and `/stats` documents
- Loader for recorded `/stats` captures
- Parser and assertions for Prometheus text exposition
*/

pub mod fixtures;
pub mod test_utils;

pub use fixtures::{beat_info_doc, FileDoc, FixtureLoader, StatsDocBuilder};
pub use test_utils::ExpositionHarness;
