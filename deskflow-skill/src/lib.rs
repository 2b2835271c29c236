//! # deskflow-skill
//!
//! Skills are long-form instruction documents an agent loads on demand:
//! markdown files with YAML frontmatter (`name`, `description`) under a
//! skills directory.
//!
//! Two integration points, mirroring how agents consume them:
//!
//! - [`load_skill_tool`] - a function tool returning a skill's full body by
//!   name
//! - [`SkillCatalog::middleware`] - appends the catalog (name + one-line
//!   description per skill) to an agent's system prompt so the model knows
//!   what it can load

pub mod catalog;
pub mod parser;

pub use catalog::{SkillCatalog, load_skill_tool};
pub use parser::{ParseError, Skill, parse_skill};
