//! Subcommand implementations

pub mod generate;
pub mod plan;
pub mod render;

pub use generate::GenerateArgs;
pub use plan::PlanArgs;
pub use render::RenderArgs;
