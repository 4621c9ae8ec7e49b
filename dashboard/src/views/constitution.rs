//! Project-wide constitution view.

use iikit_parser::{ConstitutionPrinciple, VersionMetadata, parse_constitution};
use serde::Serialize;

use crate::error::Result;
use crate::project::{Project, read_optional};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstitutionView {
    pub principles: Vec<ConstitutionPrinciple>,
    pub version: Option<VersionMetadata>,
    pub exists: bool,
}

pub fn compose(project: &Project) -> Result<ConstitutionView> {
    let content = match project.constitution_path() {
        Some(path) => read_optional(&path)?,
        None => None,
    };
    let Some(content) = content else {
        return Ok(ConstitutionView {
            principles: Vec::new(),
            version: None,
            exists: false,
        });
    };
    let constitution = parse_constitution(&content);
    Ok(ConstitutionView {
        principles: constitution.principles,
        version: constitution.version,
        exists: true,
    })
}
