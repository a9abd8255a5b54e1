//! Contact form classification
//!
//! A `<form>` counts towards a contact page only if it is not a search box,
//! a login form or a newsletter signup.

use scraper::{ElementRef, Html, Selector};

/// What the forms of one page look like
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSummary {
    /// Number of `<form>` elements on the page
    pub total: usize,

    /// Forms that could plausibly reach a person
    pub qualifying: usize,

    /// At least one qualifying form asks for an email plus free text
    pub has_message_form: bool,
}

impl FormSummary {
    pub fn has_qualifying_form(&self) -> bool {
        self.qualifying > 0
    }
}

#[derive(Debug, Default)]
struct FormFields {
    email_inputs: usize,
    free_text_inputs: usize,
    textareas: usize,
    has_password: bool,
    has_search_input: bool,
}

impl FormFields {
    fn has_free_text(&self) -> bool {
        self.textareas > 0 || self.free_text_inputs > 0
    }
}

/// Classifies every form in the document
pub fn summarize_forms(document: &Html) -> FormSummary {
    let mut summary = FormSummary::default();

    let form_selector = match Selector::parse("form") {
        Ok(selector) => selector,
        Err(_) => return summary,
    };

    for form in document.select(&form_selector) {
        summary.total += 1;

        let fields = collect_fields(&form);
        if is_search_form(&form, &fields) || fields.has_password || is_newsletter_form(&form, &fields)
        {
            continue;
        }

        summary.qualifying += 1;
        if fields.email_inputs > 0 && fields.has_free_text() {
            summary.has_message_form = true;
        }
    }

    summary
}

fn collect_fields(form: &ElementRef<'_>) -> FormFields {
    let mut fields = FormFields::default();

    if let Ok(input_selector) = Selector::parse("input") {
        for input in form.select(&input_selector) {
            let el = input.value();
            let input_type = el.attr("type").unwrap_or("text").to_lowercase();
            let hints = field_hints(&input);

            match input_type.as_str() {
                "hidden" | "submit" | "button" | "image" | "reset" | "checkbox" | "radio"
                | "file" => {}
                "password" => fields.has_password = true,
                "search" => fields.has_search_input = true,
                "email" => fields.email_inputs += 1,
                _ if is_email_hint(&hints) => fields.email_inputs += 1,
                _ if is_search_hint(&hints) => fields.has_search_input = true,
                "text" | "tel" | "url" | "" => fields.free_text_inputs += 1,
                _ => {}
            }
        }
    }

    if let Ok(textarea_selector) = Selector::parse("textarea") {
        fields.textareas = form.select(&textarea_selector).count();
    }

    fields
}

/// Lower-cased name, id and placeholder of a field
fn field_hints(input: &ElementRef<'_>) -> String {
    let el = input.value();
    ["name", "id", "placeholder", "autocomplete"]
        .iter()
        .filter_map(|attr| el.attr(attr))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn is_email_hint(hints: &str) -> bool {
    hints.contains("email") || hints.contains("e-mail") || hints.contains("mail")
}

fn is_search_hint(hints: &str) -> bool {
    hints.split(|c: char| !c.is_alphanumeric())
        .any(|token| matches!(token, "q" | "s" | "query" | "search" | "keywords"))
}

fn is_search_form(form: &ElementRef<'_>, fields: &FormFields) -> bool {
    let el = form.value();
    if el
        .attr("role")
        .map_or(false, |role| role.eq_ignore_ascii_case("search"))
    {
        return true;
    }
    if fields.has_search_input && fields.textareas == 0 {
        return true;
    }
    let action = el.attr("action").unwrap_or("").to_lowercase();
    action.contains("search") && fields.textareas == 0
}

fn is_newsletter_form(form: &ElementRef<'_>, fields: &FormFields) -> bool {
    if fields.email_inputs > 0 && !fields.has_free_text() {
        return true;
    }

    let el = form.value();
    let markers = ["action", "class", "id", "name"]
        .iter()
        .filter_map(|attr| el.attr(attr))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    (markers.contains("newsletter") || markers.contains("subscribe")) && fields.textareas == 0
}
