//! Prompt templates for the conversion agents.
//!
//! Each agent has a system prompt and a user template, both rendered with
//! minijinja. Templates are compiled into the binary.

use anyhow::{Context, Result};
use minijinja::{Environment, Value, context};
use serde::Serialize;
use tracing::debug;

use crate::core::types::AgentKind;

const TEMPLATES: [(&str, &str); 14] = [
    (
        "code_analysis.system",
        include_str!("prompts/code_analysis.system.md"),
    ),
    (
        "code_analysis.user",
        include_str!("prompts/code_analysis.user.md"),
    ),
    (
        "conversion.system",
        include_str!("prompts/conversion.system.md"),
    ),
    ("conversion.user", include_str!("prompts/conversion.user.md")),
    (
        "validation.system",
        include_str!("prompts/validation.system.md"),
    ),
    ("validation.user", include_str!("prompts/validation.user.md")),
    (
        "security_assessment.system",
        include_str!("prompts/security_assessment.system.md"),
    ),
    (
        "security_assessment.user",
        include_str!("prompts/security_assessment.user.md"),
    ),
    ("feedback.system", include_str!("prompts/feedback.system.md")),
    ("feedback.user", include_str!("prompts/feedback.user.md")),
    (
        "integration.system",
        include_str!("prompts/integration.system.md"),
    ),
    (
        "integration.user",
        include_str!("prompts/integration.user.md"),
    ),
    (
        "dbio_conversion.system",
        include_str!("prompts/dbio_conversion.system.md"),
    ),
    (
        "dbio_conversion.user",
        include_str!("prompts/dbio_conversion.user.md"),
    ),
];

/// Inputs for the feedback prompt. Reports are pre-serialized JSON.
#[derive(Debug, Clone, Copy)]
pub struct FeedbackInputs<'a> {
    pub c_code: &'a str,
    pub java_code: &'a str,
    pub validation_feedback: &'a str,
    pub security_feedback: &'a str,
}

/// One converted file handed to the integration prompt.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationFile {
    /// Name of the converted Java file.
    pub filename: String,
    /// Name of the C source it came from.
    pub source: String,
    pub java_code: String,
    pub dependencies: Vec<String>,
}

/// Template engine wrapper around minijinja.
pub struct PromptLibrary {
    env: Environment<'static>,
    java_package: String,
}

impl PromptLibrary {
    pub fn new(java_package: &str) -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        for (name, source) in TEMPLATES {
            env.add_template(name, source)
                .expect("bundled prompt template should be valid");
        }
        Self {
            env,
            java_package: java_package.to_string(),
        }
    }

    /// System prompt for an agent.
    pub fn system(&self, kind: AgentKind) -> Result<String> {
        self.render(
            kind,
            "system",
            context! { java_package => self.java_package.as_str() },
        )
    }

    pub fn code_analysis(&self, c_code: &str) -> Result<String> {
        self.render(AgentKind::CodeAnalysis, "user", context! { c_code })
    }

    pub fn conversion(&self, c_code: &str) -> Result<String> {
        self.render(AgentKind::Conversion, "user", context! { c_code })
    }

    pub fn validation(&self, c_code: &str, java_code: &str) -> Result<String> {
        self.render(
            AgentKind::Validation,
            "user",
            context! { c_code, java_code },
        )
    }

    pub fn security_assessment(&self, c_code: &str, java_code: &str) -> Result<String> {
        self.render(
            AgentKind::SecurityAssessment,
            "user",
            context! { c_code, java_code },
        )
    }

    pub fn feedback(&self, inputs: &FeedbackInputs<'_>) -> Result<String> {
        self.render(
            AgentKind::Feedback,
            "user",
            context! {
                c_code => inputs.c_code,
                java_code => inputs.java_code,
                validation_feedback => inputs.validation_feedback,
                security_feedback => inputs.security_feedback,
            },
        )
    }

    pub fn integration(&self, files: &[IntegrationFile]) -> Result<String> {
        self.render(
            AgentKind::Integration,
            "user",
            context! { converted_files => files },
        )
    }

    pub fn dbio_conversion(&self, sql_dbio_code: &str) -> Result<String> {
        self.render(
            AgentKind::DbioConversion,
            "user",
            context! { sql_dbio_code },
        )
    }

    fn render(&self, kind: AgentKind, part: &str, ctx: Value) -> Result<String> {
        let name = format!("{}.{part}", kind.template_key());
        let template = self
            .env
            .get_template(&name)
            .with_context(|| format!("load prompt template {name}"))?;
        let rendered = template
            .render(ctx)
            .with_context(|| format!("render prompt template {name}"))?;
        debug!(template = %name, bytes = rendered.len(), "rendered prompt");
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_agent_has_a_system_prompt() {
        let prompts = PromptLibrary::new("com.example");
        for kind in AgentKind::ALL {
            let system = prompts.system(kind).expect("system prompt");
            assert!(!system.trim().is_empty(), "{} system prompt empty", kind.name());
        }
    }

    #[test]
    fn conversion_system_prompt_names_configured_package() {
        let prompts = PromptLibrary::new("com.acme.billing");
        let system = prompts.system(AgentKind::Conversion).expect("system");
        assert!(system.contains("(com.acme.billing....)"));
    }

    #[test]
    fn user_prompts_embed_source_verbatim() {
        let prompts = PromptLibrary::new("com.example");
        let code = "int main(void) { return RC_NRM; }";

        let conversion = prompts.conversion(code).expect("conversion");
        assert!(conversion.contains("[C Code Start]\nint main(void) { return RC_NRM; }\n[C Code End]"));

        let validation = prompts.validation(code, "class Main {}").expect("validation");
        assert!(validation.contains(code));
        assert!(validation.contains("class Main {}"));
    }

    #[test]
    fn template_syntax_in_source_is_not_interpreted() {
        let prompts = PromptLibrary::new("com.example");
        let code = "char *s = \"{{ not_a_var }} {% raw %}\";";
        let rendered = prompts.code_analysis(code).expect("analysis");
        assert!(rendered.contains(code));
    }

    #[test]
    fn feedback_prompt_includes_both_reports() {
        let prompts = PromptLibrary::new("com.example");
        let rendered = prompts
            .feedback(&FeedbackInputs {
                c_code: "int a;",
                java_code: "int a;",
                validation_feedback: "{\"is_complete\": false}",
                security_feedback: "",
            })
            .expect("feedback");
        assert!(rendered.contains("[VALIDATION FEEDBACK]\n{\"is_complete\": false}\n[VALIDATION FEEDBACK END]"));
        assert!(rendered.contains("[SECURITY ASSESSMENT]\n\n[SECURITY ASSESSMENT END]"));
    }

    #[test]
    fn integration_prompt_lists_files_and_relationships() {
        let prompts = PromptLibrary::new("com.example");
        let rendered = prompts
            .integration(&[
                IntegrationFile {
                    filename: "OrderService.java".to_string(),
                    source: "order_service.c".to_string(),
                    java_code: "class OrderService {}".to_string(),
                    dependencies: vec!["#include \"cust.h\"".to_string()],
                },
                IntegrationFile {
                    filename: "Cust.java".to_string(),
                    source: "cust.c".to_string(),
                    java_code: "class Cust {}".to_string(),
                    dependencies: Vec::new(),
                },
            ])
            .expect("integration");

        assert!(rendered.contains("#filename: OrderService.java\nclass OrderService {}"));
        assert!(rendered.contains("order_service.c: #include \"cust.h\""));
        assert!(rendered.contains("cust.c: (no includes)"));
    }
}
