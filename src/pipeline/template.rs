//! Prompt templates rendered with minijinja.
//!
//! Templates see exactly the variables their stage declares. Absent optional
//! inputs are bound to `none`, so `{% if name %}` branches select the
//! explicit "not available" wording.

use minijinja::{Environment, UndefinedBehavior};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{GraphError, TemplateError};

pub struct PromptRenderer {
    env: Environment<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    pub fn new() -> Self {
        Self { env: configured() }
    }

    /// Compile `template` and check it only references `declared` names.
    pub fn check(&self, stage: &str, template: &str, declared: &[&str]) -> Result<(), GraphError> {
        // scratch environment: the template is not 'static
        let env = configured();
        let compiled = env
            .template_from_str(template)
            .map_err(|e| GraphError::TemplateSyntax {
                stage: stage.to_string(),
                reason: e.to_string(),
            })?;

        let mut undeclared: Vec<String> = compiled
            .undeclared_variables(false)
            .into_iter()
            .filter(|name| !declared.contains(&name.as_str()))
            .collect();
        undeclared.sort();

        match undeclared.into_iter().next() {
            Some(variable) => Err(GraphError::UndeclaredVariable {
                stage: stage.to_string(),
                variable,
            }),
            None => Ok(()),
        }
    }

    pub fn render(
        &self,
        stage: &str,
        template: &str,
        vars: &BTreeMap<String, Value>,
    ) -> Result<String, TemplateError> {
        let ctx = minijinja::Value::from_serialize(vars);
        self.env
            .render_str(template, ctx)
            .map_err(|e| TemplateError {
                stage: stage.to_string(),
                reason: e.to_string(),
            })
    }
}

fn configured<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env
}
