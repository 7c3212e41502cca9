//! 配置解析
//!
//! 支持 TOML（主要）与 JSON（可选）格式的活动文件。

use contracts::{CampaignBlueprint, ContractError};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML（推荐）
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// 根据文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 配置
pub fn parse_toml(content: &str) -> Result<CampaignBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 配置
pub fn parse_json(content: &str) -> Result<CampaignBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 按格式解析
pub fn parse(content: &str, format: ConfigFormat) -> Result<CampaignBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SourceType, TransportType};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[campaign]
name = "spring"

[transport]
transport_type = "log"

[[templates]]
body = "Hello {name}"

[[sources]]
name = "seed"
source_type = "inline"
[[sources.records]]
name = "Padaria Central"
phone = "+351 912 345 678"
locality = "Lisboa"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.campaign.name, "spring");
        assert_eq!(bp.transport.transport_type, TransportType::Log);
        assert_eq!(bp.sources.len(), 1);
        assert_eq!(bp.sources[0].source_type, SourceType::Inline);
        assert_eq!(
            bp.sources[0].records[0].contact.as_deref(),
            Some("+351 912 345 678")
        );
        assert_eq!(bp.dispatch.max_per_day, 50);
        assert_eq!(bp.collection.concurrency_limit, 4);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "campaign": { "name": "spring", "ledger_path": "/tmp/ledger.json" },
            "dispatch": { "max_per_day": 10, "max_attempts": 2 },
            "transport": { "transport_type": "file", "params": { "path": "/tmp/outbox.jsonl" } },
            "templates": [{ "body": "Hi {name}" }],
            "sources": [{ "name": "dir", "source_type": "file", "params": { "path": "dir.json" } }]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.dispatch.max_per_day, 10);
        assert_eq!(bp.dispatch.max_attempts, 2);
        assert_eq!(bp.dispatch.backoff_base_ms, 2000);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
