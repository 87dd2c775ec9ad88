// --- File: crates/connect_stripe/src/view.rs ---
//! View models for the HTML pages.
//!
//! Handlers decide what a page shows by building one of these structs; the
//! askama templates under `templates/` only lay them out.

use askama::Template;
use axum::response::{Html, IntoResponse, Redirect, Response};
use connect_common::{internal_error, page_links, PaginationQuery};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::error;

use crate::countries::{CountryCapabilities, EntityFields, FieldRule};
use crate::error::ConnectError;
use crate::fields::{self, EntityKind};
use crate::models::StripeAccount;

pub const USER_BASE: &str = "/account/connect";
pub const ADMIN_BASE: &str = "/administrator/connect";

/// Which sections of the account navigation are visible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NavbarView {
    pub stripe_id: String,
    pub individual_registration: bool,
    pub company_registration: bool,
    pub company_representative: bool,
    pub beneficial_owners: bool,
    pub beneficial_owners_editable: bool,
    pub company_directors: bool,
    pub company_directors_editable: bool,
    pub payment_details: bool,
    pub submit: bool,
    pub payouts: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkView {
    pub href: String,
    pub label: String,
}

impl LinkView {
    pub fn new(href: impl Into<String>, label: impl Into<String>) -> Self {
        LinkView {
            href: href.into(),
            label: label.into(),
        }
    }
}

impl NavbarView {
    pub fn for_account(account: &StripeAccount, country: &CountryCapabilities) -> Self {
        let open = !account.is_submitted();
        let company = account.is_company();
        let owners = company && country.supports(EntityKind::BeneficialOwner);
        let directors = company && country.supports(EntityKind::Director);
        NavbarView {
            stripe_id: account.id.clone(),
            individual_registration: account.is_individual() && open,
            company_registration: company && open,
            company_representative: company && open,
            beneficial_owners: owners,
            beneficial_owners_editable: owners && open && !account.owners_submitted(),
            company_directors: directors,
            company_directors_editable: directors && open && !account.directors_submitted(),
            payment_details: true,
            submit: open,
            payouts: !open,
        }
    }

    pub fn links(&self) -> Vec<LinkView> {
        let q = format!("?stripeid={}", self.stripe_id);
        let mut links = vec![LinkView::new(
            format!("{}/stripe-account{}", USER_BASE, q),
            "Overview",
        )];
        if self.individual_registration {
            links.push(LinkView::new(
                format!("{}/edit-individual-registration{}", USER_BASE, q),
                "Registration",
            ));
        }
        if self.company_registration {
            links.push(LinkView::new(
                format!("{}/edit-company-registration{}", USER_BASE, q),
                "Registration",
            ));
        }
        if self.company_representative {
            links.push(LinkView::new(
                format!("{}/edit-company-representative{}", USER_BASE, q),
                "Company representative",
            ));
        }
        if self.beneficial_owners {
            links.push(LinkView::new(
                format!("{}/beneficial-owners{}", USER_BASE, q),
                "Beneficial owners",
            ));
        }
        if self.company_directors {
            links.push(LinkView::new(
                format!("{}/company-directors{}", USER_BASE, q),
                "Company directors",
            ));
        }
        if self.payment_details {
            links.push(LinkView::new(
                format!("{}/edit-payment-details{}", USER_BASE, q),
                "Payment details",
            ));
        }
        if self.submit {
            links.push(LinkView::new(
                format!("{}/submit-stripe-account{}", USER_BASE, q),
                "Submit registration",
            ));
        }
        if self.payouts {
            links.push(LinkView::new(format!("{}/payouts{}", USER_BASE, q), "Payouts"));
        }
        links
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageView {
    pub code: String,
    pub text: String,
    pub success: bool,
}

impl MessageView {
    pub fn error(err: &ConnectError) -> Self {
        MessageView {
            code: err.code(),
            text: err.message(),
            success: false,
        }
    }

    pub fn success() -> Self {
        MessageView {
            code: "success".to_string(),
            text: "Your changes have been saved".to_string(),
            success: true,
        }
    }

    /// The banner for a `?message=` query parameter.
    pub fn from_query(message: Option<&str>) -> Option<Self> {
        (message == Some("success")).then(Self::success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldView {
    pub name: String,
    pub label: String,
    /// Stripe parameter of a field the Stripe.js token carries, else empty.
    pub param: String,
    pub required: bool,
    pub upload: bool,
    /// Files API purpose of an upload field.
    pub purpose: String,
    pub value: String,
    pub options: Vec<OptionView>,
}

impl FieldView {
    pub fn text(name: &str, required: bool) -> Self {
        FieldView {
            name: name.to_string(),
            label: fields::label(name),
            param: String::new(),
            required,
            upload: false,
            purpose: String::new(),
            value: String::new(),
            options: Vec::new(),
        }
    }

    pub fn select(name: &str, options: &[(&str, &str)]) -> Self {
        FieldView {
            options: options
                .iter()
                .map(|(value, label)| OptionView {
                    value: value.to_string(),
                    label: label.to_string(),
                    selected: false,
                })
                .collect(),
            ..FieldView::text(name, true)
        }
    }

    fn set_value(&mut self, value: &str) {
        self.value = value.to_string();
        for option in &mut self.options {
            option.selected = option.value == value;
        }
    }
}

const ACCOUNT_HOLDER_TYPES: &[(&str, &str)] = &[("individual", "Individual"), ("company", "Company")];

/// Form inputs for every field the country takes for this entity, in
/// catalog order.
pub fn entity_fields(entity: &EntityFields) -> Vec<FieldView> {
    entity
        .fields()
        .map(|(spec, rule)| {
            let mut field = if spec.name == "account_holder_type" {
                FieldView::select(spec.name, ACCOUNT_HOLDER_TYPES)
            } else {
                FieldView::text(spec.name, rule == FieldRule::Required)
            };
            if spec.in_token() {
                field.param = spec.param.to_string();
            }
            if let Some(purpose) = spec.upload {
                field.upload = true;
                field.purpose = purpose.as_str().to_string();
            }
            field
        })
        .collect()
}

#[derive(Template, Debug, Clone, PartialEq, Eq)]
#[template(path = "form.html")]
pub struct FormView {
    pub title: String,
    pub action: String,
    pub intro: Option<String>,
    pub fields: Vec<FieldView>,
    pub submit_label: String,
    pub error: Option<MessageView>,
    pub navbar: Option<NavbarView>,
    /// `account` or `person` when the browser tokenizes with Stripe.js.
    pub token_kind: Option<String>,
    pub business_type: Option<String>,
    pub publishable_key: Option<String>,
}

impl FormView {
    pub fn new(title: impl Into<String>, action: impl Into<String>) -> Self {
        FormView {
            title: title.into(),
            action: action.into(),
            intro: None,
            fields: Vec::new(),
            submit_label: "Save".to_string(),
            error: None,
            navbar: None,
            token_kind: None,
            business_type: None,
            publishable_key: None,
        }
    }

    pub fn multipart(&self) -> bool {
        self.fields.iter().any(|field| field.upload)
    }

    /// Refills the inputs after a failed submission. File inputs stay empty.
    pub fn with_values(mut self, values: &BTreeMap<String, String>) -> Self {
        for field in self.fields.iter_mut().filter(|field| !field.upload) {
            if let Some(value) = values.get(&field.name) {
                field.set_value(value);
            }
        }
        self
    }

    pub fn with_error(mut self, err: &ConnectError) -> Self {
        self.error = Some(MessageView::error(err));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub href: Option<String>,
    pub cells: Vec<String>,
}

#[derive(Template, Debug, Clone, PartialEq, Eq)]
#[template(path = "list.html")]
pub struct ListView {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<RowView>,
    pub total: usize,
    pub pages: Vec<PageView>,
    pub actions: Vec<LinkView>,
    pub message: Option<MessageView>,
    pub navbar: Option<NavbarView>,
}

impl ListView {
    pub fn new(title: impl Into<String>, columns: &[&str]) -> Self {
        ListView {
            title: title.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            total: 0,
            pages: Vec::new(),
            actions: Vec::new(),
            message: None,
            navbar: None,
        }
    }

    /// Numbered page links; each one appends `offset=` to `url`.
    pub fn with_pages(
        mut self,
        total: usize,
        query: &PaginationQuery,
        page_size: usize,
        url: &str,
    ) -> Self {
        let separator = if url.contains('?') { '&' } else { '?' };
        self.total = total;
        self.pages = page_links(total, query, page_size)
            .into_iter()
            .map(|link| PageView {
                number: link.number,
                href: format!("{}{}offset={}", url, separator, link.offset),
                active: link.active,
            })
            .collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView {
    pub number: usize,
    pub href: String,
    pub active: bool,
}

#[derive(Template, Debug, Clone, PartialEq, Eq)]
#[template(path = "detail.html")]
pub struct DetailView {
    pub title: String,
    pub rows: Vec<(String, String)>,
    pub actions: Vec<LinkView>,
    pub message: Option<MessageView>,
    pub navbar: Option<NavbarView>,
}

impl DetailView {
    pub fn new(title: impl Into<String>) -> Self {
        DetailView {
            title: title.into(),
            rows: Vec::new(),
            actions: Vec::new(),
            message: None,
            navbar: None,
        }
    }

    pub fn row(mut self, label: &str, value: impl ToString) -> Self {
        self.rows.push((label.to_string(), value.to_string()));
        self
    }
}

#[derive(Template, Debug, Clone, PartialEq, Eq)]
#[template(path = "message.html")]
pub struct MessagePageView {
    pub title: String,
    pub message: MessageView,
    pub navbar: Option<NavbarView>,
}

/// Renders a template into an HTML response.
pub fn render<T: Template>(template: &T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("[Connect Pages] Template rendering failed: {}", e);
            internal_error("template rendering failed").into_response()
        }
    }
}

/// A page that only shows why the request was refused.
pub fn error_page(err: &ConnectError) -> Response {
    let page = MessagePageView {
        title: "Connect".to_string(),
        message: MessageView::error(err),
        navbar: None,
    };
    (err.status(), render(&page)).into_response()
}

/// Same-origin path from a `return-url` parameter, or nothing.
pub fn safe_return_url(return_url: Option<&str>) -> Option<&str> {
    return_url.filter(|url| url.starts_with('/') && !url.starts_with("//") && !url.contains('\\'))
}

/// Redirect after a successful form submission.
pub fn success_redirect(
    return_url: Option<&str>,
    default_path: &str,
    params: &[(&str, &str)],
) -> Response {
    let target = safe_return_url(return_url).unwrap_or(default_path);
    let mut query: Vec<(&str, &str)> = params.to_vec();
    query.push(("message", "success"));
    let encoded = serde_urlencoded::to_string(&query).unwrap_or_else(|_| "message=success".to_string());
    let separator = if target.contains('?') { '&' } else { '?' };
    Redirect::to(&format!("{}{}{}", target, separator, encoded)).into_response()
}
