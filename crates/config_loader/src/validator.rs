//! 配置验证
//!
//! 规则：
//! - 数值范围（collection / dispatch 段上派生的 `Validate`）
//! - 活动名称非空
//! - 数据源名称唯一且非空
//! - file 数据源必须带 `path` 参数
//! - 至少一个非空模板
//! - file 传输必须带 `path` 参数

use std::collections::HashSet;

use contracts::{CampaignBlueprint, ContractError, SourceType, TransportType};
use validator::Validate;

/// 验证 CampaignBlueprint
///
/// 返回遇到的第一个错误，或 Ok(())。
pub fn validate(blueprint: &CampaignBlueprint) -> Result<(), ContractError> {
    validate_campaign(blueprint)?;
    validate_ranges(blueprint)?;
    validate_sources(blueprint)?;
    validate_templates(blueprint)?;
    validate_transport(blueprint)?;
    Ok(())
}

fn validate_campaign(blueprint: &CampaignBlueprint) -> Result<(), ContractError> {
    if blueprint.campaign.name.trim().is_empty() {
        return Err(ContractError::config_validation(
            "campaign.name",
            "campaign name cannot be empty",
        ));
    }
    Ok(())
}

fn validate_ranges(blueprint: &CampaignBlueprint) -> Result<(), ContractError> {
    blueprint
        .collection
        .validate()
        .map_err(|e| ContractError::config_validation("collection", e.to_string()))?;
    blueprint
        .dispatch
        .validate()
        .map_err(|e| ContractError::config_validation("dispatch", e.to_string()))?;
    Ok(())
}

/// 数据源名称唯一（同时作为记录的来源标签）
fn validate_sources(blueprint: &CampaignBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, source) in blueprint.sources.iter().enumerate() {
        if source.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("sources[{idx}].name"),
                "source name cannot be empty",
            ));
        }
        if !seen.insert(&source.name) {
            return Err(ContractError::config_validation(
                format!("sources[name={}]", source.name),
                "duplicate source name",
            ));
        }
        if source.source_type == SourceType::File && !source.params.contains_key("path") {
            return Err(ContractError::config_validation(
                format!("sources[{}].params.path", source.name),
                "file source requires a 'path' parameter",
            ));
        }
    }
    Ok(())
}

fn validate_templates(blueprint: &CampaignBlueprint) -> Result<(), ContractError> {
    if blueprint.templates.is_empty() {
        return Err(ContractError::config_validation(
            "templates",
            "at least one message template is required",
        ));
    }
    for (idx, template) in blueprint.templates.iter().enumerate() {
        if template.body.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("templates[{idx}].body"),
                "template body cannot be empty",
            ));
        }
    }
    Ok(())
}

fn validate_transport(blueprint: &CampaignBlueprint) -> Result<(), ContractError> {
    let transport = &blueprint.transport;
    if transport.transport_type == TransportType::File && !transport.params.contains_key("path") {
        return Err(ContractError::config_validation(
            "transport.params.path",
            "file transport requires a 'path' parameter",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        CampaignConfig, CandidateRecord, CollectionConfig, ConfigVersion, DispatchConfig,
        SourceConfig, TemplateConfig, TransportConfig,
    };
    use std::collections::HashMap;

    fn minimal_blueprint() -> CampaignBlueprint {
        CampaignBlueprint {
            version: ConfigVersion::V1,
            campaign: CampaignConfig {
                name: "spring".into(),
                ledger_path: "ledger.json".into(),
                store_path: "records.json".into(),
            },
            collection: CollectionConfig::default(),
            dispatch: DispatchConfig::default(),
            transport: TransportConfig {
                transport_type: TransportType::Log,
                params: HashMap::new(),
            },
            templates: vec![TemplateConfig {
                name: None,
                body: "Hello {name}".into(),
            }],
            sources: vec![SourceConfig::inline(
                "seed",
                vec![CandidateRecord::new("seed", "Shop", "912345678", "Lisboa")],
            )],
        }
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_duplicate_source_name() {
        let mut bp = minimal_blueprint();
        bp.sources.push(bp.sources[0].clone());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate source name"), "got: {err}");
    }

    #[test]
    fn test_file_source_requires_path() {
        let mut bp = minimal_blueprint();
        bp.sources[0].source_type = SourceType::File;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("'path'"), "got: {err}");
    }

    #[test]
    fn test_templates_required() {
        let mut bp = minimal_blueprint();
        bp.templates.clear();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("at least one message template"), "got: {err}");
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut bp = minimal_blueprint();
        bp.dispatch.max_attempts = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("dispatch"), "got: {err}");
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut bp = minimal_blueprint();
        bp.collection.concurrency_limit = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("collection"), "got: {err}");
    }

    #[test]
    fn test_file_transport_requires_path() {
        let mut bp = minimal_blueprint();
        bp.transport.transport_type = TransportType::File;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("file transport"), "got: {err}");
    }

    #[test]
    fn test_empty_campaign_name() {
        let mut bp = minimal_blueprint();
        bp.campaign.name = "  ".into();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }
}
