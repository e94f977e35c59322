pub mod schema;

pub use schema::{
    Config, DeliveryConfig, LimitsConfig, MatchKind, ReplyConfig, RuleConfig, ServerConfig,
    TemplateSourceConfig, TemplateSourceKind,
};
