//! Campaign file loading.
//!
//! A campaign is described by one TOML (or JSON) file. Loading parses it
//! into a [`CampaignBlueprint`] and runs every validation rule before the
//! blueprint is handed to collection or dispatch.
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("campaign.toml")).unwrap();
//! println!("{} templates", blueprint.templates.len());
//! ```

mod parser;
mod validator;

pub use contracts::CampaignBlueprint;
pub use parser::ConfigFormat;

use std::path::Path;

use contracts::ContractError;
use tracing::debug;

/// Entry points for reading campaign files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Read, parse and validate a campaign file.
    ///
    /// The format follows the extension (`.toml` or `.json`).
    pub fn load_from_path(path: &Path) -> Result<CampaignBlueprint, ContractError> {
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ConfigFormat::from_extension)
            .ok_or_else(|| {
                ContractError::config_parse(format!(
                    "{}: expected a .toml or .json campaign file",
                    path.display()
                ))
            })?;

        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), ?format, bytes = content.len(), "Read campaign file");
        Self::load_from_str(&content, format)
    }

    /// Parse and validate campaign text already in memory
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<CampaignBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        Self::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Re-run validation, e.g. after command-line overrides.
    pub fn validate(blueprint: &CampaignBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }
}
