//! Statement rendering.
//!
//! The renderer turns a [`StatementContext`] into template data and runs it
//! through Handlebars. Amounts are formatted by the `money` and `percent`
//! helpers; a field that was never set renders as zero.

use std::str::FromStr;

use finstate_shared::types::{format_amount, format_percent};
use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderError, no_escape,
};
use rust_decimal::Decimal;
use serde_json::{Map, Value as Json, json};
use tracing::debug;

use super::context::StatementContext;
use super::error::ReportError;
use super::templates::TemplateStore;
use super::types::{BalanceResult, StatementKind};
use super::verifier::BalanceVerifier;

/// Renders statements from templates in a [`TemplateStore`].
#[derive(Debug, Clone, Default)]
pub struct StatementRenderer {
    store: TemplateStore,
    verifier: BalanceVerifier,
}

impl StatementRenderer {
    /// Creates a renderer over `store` that checks balances with `verifier`.
    #[must_use]
    pub const fn new(store: TemplateStore, verifier: BalanceVerifier) -> Self {
        Self { store, verifier }
    }

    /// Returns the template store.
    #[must_use]
    pub const fn store(&self) -> &TemplateStore {
        &self.store
    }

    /// Renders the default template for `kind`.
    pub fn render(&self, kind: StatementKind, ctx: &StatementContext) -> Result<String, ReportError> {
        let data = self.template_data(kind, ctx);
        self.render_data(kind.template_name(), &data)
    }

    /// Renders a template by name. The balance pair is taken from the
    /// statement kind the name belongs to, or debits against credits.
    pub fn render_template(
        &self,
        name: &str,
        ctx: &StatementContext,
    ) -> Result<String, ReportError> {
        let kind = StatementKind::from_template_name(name).unwrap_or(StatementKind::TrialBalance);
        let data = self.template_data(kind, ctx);
        self.render_data(name, &data)
    }

    /// Builds the JSON object a template for `kind` is rendered against.
    #[must_use]
    pub fn template_data(&self, kind: StatementKind, ctx: &StatementContext) -> Json {
        let mut data = Map::new();
        for (field, value) in ctx.fields() {
            data.insert(field.to_string(), Json::String(value.to_string()));
        }

        let balance = self.balance_for(kind, ctx);
        data.insert("balance_check".into(), Json::Bool(balance.is_balanced));
        data.insert(
            "balance_difference".into(),
            Json::String(balance.difference.to_string()),
        );

        if let Some(company) = &ctx.company_name {
            data.insert("company_name".into(), Json::String(company.clone()));
        }
        data.insert("date".into(), Json::String(ctx.display_date()));
        data.insert("generation_date".into(), Json::String(ctx.generation_date()));
        data.insert("total_accounts".into(), json!(ctx.accounts.len()));
        data.insert("accounts".into(), json!(ctx.accounts));
        data.insert("account_type_summary".into(), json!(ctx.account_type_summary));

        Json::Object(data)
    }

    fn balance_for(&self, kind: StatementKind, ctx: &StatementContext) -> BalanceResult {
        ctx.balance.unwrap_or_else(|| {
            let (left, right) = kind.balance_fields();
            self.verifier.verify(ctx.get(left), ctx.get(right))
        })
    }

    fn render_data(&self, name: &str, data: &Json) -> Result<String, ReportError> {
        let template = self.store.load(name)?;
        debug!(template = %template.name, origin = ?template.origin, "Rendering statement");

        let mut registry = Handlebars::new();
        registry.register_escape_fn(no_escape);
        registry.register_helper("money", Box::new(money_helper));
        registry.register_helper("percent", Box::new(percent_helper));
        registry.register_helper("default", Box::new(default_helper));
        registry
            .register_template_string(&template.name, &template.source)
            .map_err(|e| ReportError::InvalidTemplate {
                name: template.name.clone(),
                message: e.to_string(),
            })?;

        registry
            .render(&template.name, data)
            .map_err(|e| ReportError::Render(e.to_string()))
    }
}

/// Reads a helper parameter as an amount; missing values are zero.
fn decimal_param(h: &Helper, helper: &str) -> Result<Decimal, RenderError> {
    let value = h.param(0).map_or(&Json::Null, |p| p.value());
    match value {
        Json::Null => Ok(Decimal::ZERO),
        Json::String(s) if s.trim().is_empty() => Ok(Decimal::ZERO),
        Json::String(s) => Decimal::from_str(s.trim())
            .map_err(|_| RenderError::new(format!("{helper}: {s:?} is not an amount"))),
        Json::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .map_err(|_| RenderError::new(format!("{helper}: {n} is not an amount"))),
        other => Err(RenderError::new(format!("{helper}: {other} is not an amount"))),
    }
}

/// `{{money field}}` renders a two-decimal amount.
fn money_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let amount = decimal_param(h, "money")?;
    out.write(&format_amount(amount))?;
    Ok(())
}

/// `{{percent field}}` renders a one-decimal percentage.
fn percent_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = decimal_param(h, "percent")?;
    out.write(&format_percent(value))?;
    Ok(())
}

/// `{{default value fallback}}` renders `value` unless it is missing or blank.
fn default_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = h.param(0).map(|p| p.value());
    let chosen = match value {
        None | Some(Json::Null) => h.param(1).map(|p| p.value()),
        Some(Json::String(s)) if s.trim().is_empty() => h.param(1).map(|p| p.value()),
        other => other,
    };

    match chosen {
        Some(Json::String(s)) => out.write(s)?,
        Some(Json::Null) | None => {}
        Some(other) => out.write(&other.to_string())?,
    }
    Ok(())
}
